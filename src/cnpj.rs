//! CNPJ identifier handling.
//!
//! A CNPJ has 14 digits: an 8-digit base, a 4-digit branch number and two
//! check digits. It is often written masked as `NN.NNN.NNN/NNNN-NN`.

/// Number of digits in an unmasked CNPJ.
pub const LENGTH: usize = 14;

const FIRST_WEIGHTS: [u32; 12] = [5, 4, 3, 2, 9, 8, 7, 6, 5, 4, 3, 2];
const SECOND_WEIGHTS: [u32; 13] = [6, 5, 4, 3, 2, 9, 8, 7, 6, 5, 4, 3, 2];

/// Remove the mask characters (`.`, `/`, `-`) from a CNPJ.
pub fn unmask(value: &str) -> String {
    value
        .chars()
        .filter(|c| !matches!(c, '.' | '/' | '-'))
        .collect()
}

/// Check that `value` (masked or not) is a well-formed CNPJ with valid
/// check digits.
pub fn is_valid(value: &str) -> bool {
    let digits: Vec<u32> = match unmask(value)
        .chars()
        .map(|c| c.to_digit(10))
        .collect::<Option<Vec<_>>>()
    {
        Some(d) if d.len() == LENGTH => d,
        _ => return false,
    };

    // Repeated digits pass the checksum but are never issued.
    if digits.iter().all(|d| *d == digits[0]) {
        return false;
    }

    check_digit(&digits[..12], &FIRST_WEIGHTS) == digits[12]
        && check_digit(&digits[..13], &SECOND_WEIGHTS) == digits[13]
}

fn check_digit(digits: &[u32], weights: &[u32]) -> u32 {
    let sum: u32 = digits.iter().zip(weights).map(|(d, w)| d * w).sum();
    match sum % 11 {
        r if r < 2 => 0,
        r => 11 - r,
    }
}
