// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Canonical transaction encoding and hashing.
//!
//! The body is RLP encoded in a fixed field order:
//!
//! ```text
//! [chainTag, blockRef, expiration, [[to, value, data], ...],
//!  gasPriceCoef, gas, dependsOn, nonce, [features, ...unused], signature?]
//! ```
//!
//! Numeric fields use compact big-endian encoding (zero is the empty
//! string). `to` and `dependsOn` are empty when absent. Trailing empty
//! entries of `reserved` are trimmed, so a body without features encodes
//! `reserved` as an empty list.

use alloy::primitives::{Address, B256};
use alloy::rlp::{Encodable, Header, EMPTY_STRING_CODE};
use blake2::{digest::consts::U32, Blake2b, Digest};

use super::types::{Clause, Reserved, TransactionBody};

type Blake2b256 = Blake2b<U32>;

/// Intrinsic gas charged for every transaction.
pub const TX_GAS: u64 = 5_000;
/// Intrinsic gas charged per regular clause.
pub const CLAUSE_GAS: u64 = 16_000;
/// Intrinsic gas charged per contract-creation clause.
pub const CLAUSE_GAS_CONTRACT_CREATION: u64 = 48_000;
const ZERO_BYTE_GAS: u64 = 4;
const NON_ZERO_BYTE_GAS: u64 = 68;

/// BLAKE2b with a 256-bit output over the concatenation of `parts`.
pub fn blake2b256(parts: &[&[u8]]) -> B256 {
    let mut hasher = Blake2b256::new();
    for part in parts {
        hasher.update(part);
    }
    B256::from_slice(&hasher.finalize())
}

/// RLP encoding of the body without signature.
pub fn encode_unsigned(body: &TransactionBody) -> Vec<u8> {
    encode_body(body, None)
}

/// RLP encoding of the body with the signature appended as the last field.
pub fn encode_signed(body: &TransactionBody, signature: &[u8]) -> Vec<u8> {
    encode_body(body, Some(signature))
}

/// Digest every signer signs (directly or bound to an origin).
pub fn signing_hash(body: &TransactionBody) -> B256 {
    blake2b256(&[encode_unsigned(body).as_slice()])
}

/// BLAKE2b-256(signing hash ‖ origin).
///
/// This is both the transaction id and the digest a fee sponsor signs
/// on behalf of `origin`.
pub fn origin_bound_hash(signing_hash: &B256, origin: Address) -> B256 {
    blake2b256(&[signing_hash.as_slice(), origin.as_slice()])
}

/// Intrinsic gas of a clause list.
pub fn intrinsic_gas(clauses: &[Clause]) -> u64 {
    if clauses.is_empty() {
        return TX_GAS + CLAUSE_GAS;
    }

    clauses.iter().fold(TX_GAS, |total, clause| {
        let clause_gas = if clause.is_contract_creation() {
            CLAUSE_GAS_CONTRACT_CREATION
        } else {
            CLAUSE_GAS
        };
        total + clause_gas + data_gas(&clause.data)
    })
}

fn data_gas(data: &[u8]) -> u64 {
    data.iter()
        .map(|b| if *b == 0 { ZERO_BYTE_GAS } else { NON_ZERO_BYTE_GAS })
        .sum()
}

fn encode_body(body: &TransactionBody, signature: Option<&[u8]>) -> Vec<u8> {
    let mut payload = Vec::new();
    body.chain_tag.encode(&mut payload);
    body.block_ref.encode(&mut payload);
    body.expiration.encode(&mut payload);

    let mut clauses = Vec::new();
    for clause in &body.clauses {
        encode_clause(clause, &mut clauses);
    }
    push_list(&clauses, &mut payload);

    body.gas_price_coef.encode(&mut payload);
    body.gas.encode(&mut payload);
    match &body.depends_on {
        Some(id) => id.encode(&mut payload),
        None => payload.push(EMPTY_STRING_CODE),
    }
    body.nonce.encode(&mut payload);
    encode_reserved(body.reserved.as_ref(), &mut payload);

    if let Some(sig) = signature {
        sig.encode(&mut payload);
    }

    let mut out = Vec::with_capacity(payload.len() + 4);
    push_list(&payload, &mut out);
    out
}

fn encode_clause(clause: &Clause, out: &mut Vec<u8>) {
    let mut payload = Vec::new();
    match &clause.to {
        Some(to) => to.encode(&mut payload),
        None => payload.push(EMPTY_STRING_CODE),
    }
    clause.value.encode(&mut payload);
    clause.data.encode(&mut payload);
    push_list(&payload, out);
}

fn encode_reserved(reserved: Option<&Reserved>, out: &mut Vec<u8>) {
    let mut items: Vec<Vec<u8>> = Vec::new();
    if let Some(reserved) = reserved {
        let mut features = Vec::new();
        reserved.features.encode(&mut features);
        items.push(features);
        for extra in &reserved.unused {
            let mut item = Vec::new();
            extra.encode(&mut item);
            items.push(item);
        }
    }

    while items.last().map(|item| item.as_slice() == [EMPTY_STRING_CODE]).unwrap_or(false) {
        items.pop();
    }

    let payload: Vec<u8> = items.concat();
    push_list(&payload, out);
}

fn push_list(payload: &[u8], out: &mut Vec<u8>) {
    Header {
        list: true,
        payload_length: payload.len(),
    }
    .encode(out);
    out.extend_from_slice(payload);
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use alloy::primitives::{Bytes, U256};

    use super::*;

    fn sample_body() -> TransactionBody {
        TransactionBody {
            chain_tag: 1,
            block_ref: 0xaabbccdd,
            expiration: 32,
            clauses: vec![
                Clause::new(
                    Some(Address::from_str("0x7567d83b7b8d80addcb281a71d54fc7b3364ffed").unwrap()),
                    U256::from(10_000u64),
                    Bytes::from(vec![0x00, 0x00, 0x00, 0x60, 0x60, 0x60]),
                ),
                Clause::new(
                    Some(Address::from_str("0x7567d83b7b8d80addcb281a71d54fc7b3364ffed").unwrap()),
                    U256::from(20_000u64),
                    Bytes::from(vec![0x00, 0x00, 0x00, 0x60, 0x60, 0x60]),
                ),
            ],
            gas_price_coef: 128,
            gas: 21_000,
            depends_on: None,
            nonce: 12_345_678,
            reserved: None,
        }
    }

    #[test]
    fn blake2b256_of_empty_input() {
        assert_eq!(
            format!("{:x}", blake2b256(&[])),
            "0e5751c026e543b2e8ab2eb06099daa1d1e5df47778f7787faab45cdf12fe3a8"
        );
    }

    #[test]
    fn blake2b256_concatenates_parts() {
        assert_eq!(
            blake2b256(&[b"ab".as_slice(), b"c".as_slice()]),
            blake2b256(&[b"abc".as_slice()])
        );
    }

    #[test]
    fn unsigned_encoding_matches_reference_vector() {
        let encoded = encode_unsigned(&sample_body());
        assert_eq!(
            alloy::hex::encode(&encoded),
            concat!(
                "f8540184aabbccdd20f840df947567d83b7b8d80addcb281a71d54fc7b3364ff",
                "ed82271086000000606060df947567d83b7b8d80addcb281a71d54fc7b3364ff",
                "ed824e208600000060606081808252088083bc614ec0",
            )
        );
    }

    #[test]
    fn signing_hash_matches_reference_vector() {
        assert_eq!(
            format!("{:x}", signing_hash(&sample_body())),
            "2a1c25ce0d66f45276a5f308b99bf410e2fc7d5b6ea37a49f2ab9f1da9446478"
        );
    }

    #[test]
    fn delegation_feature_changes_encoding() {
        let plain = sample_body();
        let delegated = sample_body().with_delegation();
        let plain_raw = encode_unsigned(&plain);
        let delegated_raw = encode_unsigned(&delegated);
        assert_eq!(plain_raw.last(), Some(&0xc0));
        assert!(delegated_raw.ends_with(&[0xc1, 0x01]));
        assert_ne!(signing_hash(&plain), signing_hash(&delegated));
    }

    #[test]
    fn zero_features_reserved_encodes_as_empty_list() {
        let mut body = sample_body();
        body.reserved = Some(Reserved::default());
        assert_eq!(encode_unsigned(&body), encode_unsigned(&sample_body()));
    }

    #[test]
    fn signed_encoding_appends_signature() {
        let body = sample_body();
        let signature = [7u8; 65];
        let signed = encode_signed(&body, &signature);
        assert!(signed.len() > encode_unsigned(&body).len() + 65);
        assert!(signed.ends_with(&signature));
    }

    #[test]
    fn intrinsic_gas_counts_clause_kinds_and_data() {
        assert_eq!(intrinsic_gas(&[]), 21_000);

        let transfer = Clause::transfer(Address::ZERO, U256::from(1));
        assert_eq!(intrinsic_gas(&[transfer.clone()]), 21_000);

        let deploy = Clause::new(None, U256::ZERO, Bytes::from(vec![0x00, 0x60]));
        assert_eq!(intrinsic_gas(&[deploy]), 5_000 + 48_000 + 4 + 68);

        assert_eq!(intrinsic_gas(&[transfer.clone(), transfer]), 37_000);
    }

    #[test]
    fn origin_bound_hash_depends_on_origin() {
        let hash = signing_hash(&sample_body());
        let a = origin_bound_hash(&hash, Address::ZERO);
        let b = origin_bound_hash(&hash, Address::repeat_byte(1));
        assert_ne!(a, b);
    }
}
