//! Contract interfaces and call decoding
//!
//! Both replayed contracts are described with `sol!` so call data decodes
//! straight into typed call enums. Anything whose selector is not part of an
//! interface, or whose arguments do not decode, comes back as an error and is
//! skipped by the replay engine.

use alloy_sol_types::{sol, SolInterface};

sol! {
    /// Token contract with an owner-managed allow-list.
    interface Psyop {
        function setAddressToWhiteList(address account, bool allowed) external;
        function transfer(address to, uint256 amount) external returns (bool);
        function transferFrom(address from, address to, uint256 amount) external returns (bool);
        function approve(address spender, uint256 amount) external returns (bool);
        function renounceOwnership() external;
        function transferOwnership(address newOwner) external;
    }

    /// Bulk distribution contract.
    interface AirDrop {
        function airdropERC20(address token, address[] recipients, uint256[] amounts) external;
    }
}

/// Decode call data sent to the allow-list token contract.
pub fn decode_psyop_call(input: &[u8]) -> Result<Psyop::PsyopCalls, alloy_sol_types::Error> {
    Psyop::PsyopCalls::abi_decode(input, true)
}

/// Decode call data sent to the airdrop contract.
pub fn decode_airdrop_call(input: &[u8]) -> Result<AirDrop::AirDropCalls, alloy_sol_types::Error> {
    AirDrop::AirDropCalls::abi_decode(input, true)
}

/// Render a 4-byte selector (or whatever prefix exists) for diagnostics.
pub fn selector_hex(input: &[u8]) -> String {
    format!("0x{}", hex::encode(&input[..input.len().min(4)]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{address, U256};
    use alloy_sol_types::SolCall;

    #[test]
    fn test_whitelist_call_roundtrip() {
        let call = Psyop::setAddressToWhiteListCall {
            account: address!("FA080F371f2B9986dFD0A692DA4da343178233D0"),
            allowed: false,
        };
        let input = call.abi_encode();
        assert_eq!(&input[..4], Psyop::setAddressToWhiteListCall::SELECTOR.as_slice());

        match decode_psyop_call(&input).unwrap() {
            Psyop::PsyopCalls::setAddressToWhiteList(decoded) => {
                assert_eq!(decoded.account, call.account);
                assert_eq!(decoded.allowed, call.allowed);
            }
            _ => panic!("expected setAddressToWhiteList"),
        }
    }

    #[test]
    fn test_airdrop_call_decodes() {
        let call = AirDrop::airdropERC20Call {
            token: address!("3007083EAA95497cD6B2b809fB97B6A30bdF53D3"),
            recipients: vec![address!("0000000000000000000000000000000000000001")],
            amounts: vec![U256::from(5u64)],
        };
        let AirDrop::AirDropCalls::airdropERC20(decoded) =
            decode_airdrop_call(&call.abi_encode()).unwrap();
        assert_eq!(decoded.token, call.token);
        assert_eq!(decoded.recipients, call.recipients);
        assert_eq!(decoded.amounts, call.amounts);
    }

    #[test]
    fn test_unknown_selector_is_error() {
        assert!(decode_psyop_call(&[0xde, 0xad, 0xbe, 0xef]).is_err());
        assert!(decode_airdrop_call(&[]).is_err());
    }

    #[test]
    fn test_truncated_arguments_are_error() {
        let mut input = Psyop::setAddressToWhiteListCall {
            account: address!("0000000000000000000000000000000000000002"),
            allowed: true,
        }
        .abi_encode();
        input.truncate(20);
        assert!(decode_psyop_call(&input).is_err());
    }

    #[test]
    fn test_selector_hex() {
        assert_eq!(selector_hex(&[0xa9, 0x05, 0x9c, 0xbb, 0x00]), "0xa9059cbb");
        assert_eq!(selector_hex(&[0x01]), "0x01");
    }

    #[test]
    fn test_signatures() {
        assert_eq!(
            Psyop::setAddressToWhiteListCall::SIGNATURE,
            "setAddressToWhiteList(address,bool)"
        );
        assert_eq!(
            AirDrop::airdropERC20Call::SIGNATURE,
            "airdropERC20(address,address[],uint256[])"
        );
    }
}
