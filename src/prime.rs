//! Bucket-count sizing: the smallest prime not less than a request.
//!
//! Small requests are answered from a table of the primes up to 211. Larger
//! requests only consider candidates on the wheel of 210 (`2 * 3 * 5 * 7`):
//! the 48 residues modulo 210 that share no factor with it. Each candidate is
//! trial-divided by the small primes from 11, then by the wheel-spaced
//! numbers from 211 on, until a factor turns up or the divisor passes the
//! square root.

/// Primes up to and including 211.
const SMALL_PRIMES: [usize; 47] = [
    2, 3, 5, 7, 11, 13, 17, 19, 23, 29, 31, 37, 41, 43, 47, 53, 59, 61, 67, 71, 73, 79, 83, 89, 97,
    101, 103, 107, 109, 113, 127, 131, 137, 139, 149, 151, 157, 163, 167, 173, 179, 181, 191, 193,
    197, 199, 211,
];

const LARGEST_SMALL_PRIME: usize = SMALL_PRIMES[SMALL_PRIMES.len() - 1];

/// Index of 11 in [`SMALL_PRIMES`]; wheel candidates are never divisible by
/// anything before it.
const FIRST_TRIAL_PRIME: usize = 4;

const WHEEL: usize = 210;

/// Residues modulo 210 coprime to 210.
const RESIDUES: [usize; 48] = [
    1, 11, 13, 17, 19, 23, 29, 31, 37, 41, 43, 47, 53, 59, 61, 67, 71, 73, 79, 83, 89, 97, 101, 103,
    107, 109, 113, 121, 127, 131, 137, 139, 143, 149, 151, 157, 163, 167, 169, 173, 179, 181, 187,
    191, 193, 197, 199, 209,
];

/// Distance from each residue to the next one, wrapping 209 back to 211.
const GAPS: [usize; 48] = [
    10, 2, 4, 2, 4, 6, 2, 6, 4, 2, 4, 6, 6, 2, 6, 4, 2, 6, 4, 6, 8, 4, 2, 4, 2, 4, 8, 6, 4, 6, 2, 4,
    6, 2, 6, 6, 4, 2, 4, 6, 2, 6, 4, 2, 4, 2, 10, 2,
];

cfg_if::cfg_if! {
    if #[cfg(target_pointer_width = "64")] {
        /// The largest prime representable in a `usize`.
        pub const LARGEST_PRIME: usize = 0xffff_ffff_ffff_ffc5;
    } else if #[cfg(target_pointer_width = "32")] {
        /// The largest prime representable in a `usize`.
        pub const LARGEST_PRIME: usize = 0xffff_fffb;
    } else {
        /// The largest prime representable in a `usize`.
        pub const LARGEST_PRIME: usize = 0xfff1;
    }
}

/// Trial division for a wheel candidate above 211.
///
/// The candidate is already known to be coprime to 2, 3, 5 and 7.
fn wheel_candidate_is_prime(n: usize) -> bool {
    debug_assert!(n > LARGEST_SMALL_PRIME);

    for &p in &SMALL_PRIMES[FIRST_TRIAL_PRIME..SMALL_PRIMES.len() - 1] {
        let q = n / p;
        if q < p {
            return true;
        }
        if n == q * p {
            return false;
        }
    }

    let mut divisor = LARGEST_SMALL_PRIME;
    let mut gap = 0;
    loop {
        let q = n / divisor;
        if q < divisor {
            return true;
        }
        if n == q * divisor {
            return false;
        }
        divisor += GAPS[gap];
        gap = if gap + 1 == GAPS.len() { 0 } else { gap + 1 };
    }
}

/// Returns the smallest prime `p >= n`, saturating at [`LARGEST_PRIME`].
///
/// # Examples
///
/// ```rust
/// use prime_chain::prime::next_prime;
///
/// assert_eq!(next_prime(0), 2);
/// assert_eq!(next_prime(8), 11);
/// assert_eq!(next_prime(211), 211);
/// assert_eq!(next_prime(212), 223);
/// ```
pub fn next_prime(n: usize) -> usize {
    if n <= LARGEST_SMALL_PRIME {
        return SMALL_PRIMES[SMALL_PRIMES.partition_point(|&p| p < n)];
    }
    if n >= LARGEST_PRIME {
        return LARGEST_PRIME;
    }

    let mut block = n / WHEEL;
    let mut index = RESIDUES.partition_point(|&r| r < n - block * WHEEL);
    // `n` is below `LARGEST_PRIME`, which sits on the wheel, so the walk stops
    // at or before it and the candidate never overflows.
    loop {
        if index == RESIDUES.len() {
            block += 1;
            index = 0;
        }
        let candidate = WHEEL * block + RESIDUES[index];
        if wheel_candidate_is_prime(candidate) {
            return candidate;
        }
        index += 1;
    }
}

/// Returns `true` if `n` is prime.
pub fn is_prime(n: usize) -> bool {
    if n <= LARGEST_SMALL_PRIME {
        return SMALL_PRIMES.binary_search(&n).is_ok();
    }
    if SMALL_PRIMES[..FIRST_TRIAL_PRIME].iter().any(|&p| n % p == 0) {
        return false;
    }
    wheel_candidate_is_prime(n)
}
