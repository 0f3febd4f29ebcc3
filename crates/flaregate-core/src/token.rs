// SPDX-FileCopyrightText: 2026 Flaregate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Opaque token generation for verification codes and access keys.

use rand::Rng;

const BASE36_UPPER: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Prefix of every verification code.
pub const VERIFICATION_CODE_PREFIX: &str = "Verify_";

/// Prefix of every access key.
pub const ACCESS_KEY_PREFIX: &str = "FK_";

/// Returns `len` random characters from the uppercase base36 alphabet.
pub fn random_base36(len: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|_| BASE36_UPPER[rng.gen_range(0..BASE36_UPPER.len())] as char)
        .collect()
}

/// `Verify_` followed by 8 uppercase base36 characters.
pub fn verification_code() -> String {
    format!("{VERIFICATION_CODE_PREFIX}{}", random_base36(8))
}

/// `FK_` followed by 12 uppercase base36 characters.
pub fn access_key() -> String {
    format!("{ACCESS_KEY_PREFIX}{}", random_base36(12))
}
