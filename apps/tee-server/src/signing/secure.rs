// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Scoped secret buffers
//!
//! Secret material (PKCS#8 blobs, decoded keys, canonical payloads) moves
//! through [`SecretBytes`] buffers that are zeroed on drop with writes the
//! compiler cannot elide. Equality checks on secrets go through the
//! constant-time comparator, never `==`.
//!
//! The enclave platform keeps memory non-swappable, so no additional
//! page-locking is performed here.

use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

/// A byte buffer that is zeroed when it goes out of scope.
pub type SecretBytes = Zeroizing<Vec<u8>>;

/// Copy `data` into a fresh scoped buffer.
pub fn secret_from_slice(data: &[u8]) -> SecretBytes {
    Zeroizing::new(data.to_vec())
}

/// Constant-time equality for secret material. Length is compared first;
/// unequal lengths return early, which leaks only the length and never the
/// contents.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_buffers_compare_equal() {
        assert!(constant_time_eq(b"same-bytes", b"same-bytes"));
        assert!(constant_time_eq(b"", b""));
    }

    #[test]
    fn different_buffers_compare_unequal() {
        assert!(!constant_time_eq(b"same-bytes", b"same-bytez"));
        assert!(!constant_time_eq(b"short", b"longer-value"));
    }

    #[test]
    fn secret_from_slice_copies() {
        let original = [1u8, 2, 3, 4];
        let secret = secret_from_slice(&original);
        assert_eq!(secret.as_slice(), &original);
    }
}
