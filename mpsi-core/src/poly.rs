//! Per-element polynomial shares (degree-`(k-1)` Shamir-style sharing over
//! GF(2^128)).
//!
//! For element `x`, the polynomial `f_x(t) = x ⊕ r_1 t ⊕ ... ⊕ r_{k-1} t^{k-1}`
//! has constant term `x`. The coefficients `r_1..r_{k-1}` are derived
//! pseudo-randomly from `x` alone, via a single global salt -- **never** from
//! the party index `i` -- so that every party computes the identical
//! polynomial for a shared `x` and `k` of their evaluations reconstruct it.
//!
//! One early draft of this scheme mixed the party id into the coefficient
//! seed; that variant breaks cross-party Lagrange recovery and must not be
//! resurrected (see `DESIGN.md`).

use crate::field::Field;
use crate::prf;
use zeroize::ZeroizeOnDrop;

/// Global domain separator for polynomial coefficient derivation. Fixed and
/// independent of any party index -- the central correctness invariant of
/// this module.
const POLY_SALT: u64 = 0x506F_6C79_5368_6172; // "PolyShar"
const POLY_COEFF_DOMAIN: &[u8] = b"mpsi-poly-coeff";

/// Derives the `k-1` non-constant coefficients of `f_x`, deterministically
/// from `x` alone.
fn coeffs(x: Field, k: usize) -> Vec<Field> {
    if k <= 1 {
        return Vec::new();
    }
    prf::derive_fields(POLY_SALT, POLY_COEFF_DOMAIN, &x.to_le_bytes(), k - 1)
}

/// The per-element polynomial `f_x`, threshold `k` (degree `k-1`).
///
/// Holds `x` itself alongside the coefficients that hide it below threshold
/// `k`; zeroized on drop once a party is done evaluating its own share.
#[derive(Clone, Debug, ZeroizeOnDrop)]
pub struct ElementPolynomial {
    /// `x`, followed by `r_1, ..., r_{k-1}` (Horner order, constant term
    /// first).
    coeffs: Vec<Field>,
}

impl ElementPolynomial {
    /// Builds the polynomial for element `x` under threshold `k`.
    pub fn for_element(x: Field, k: usize) -> Self {
        let mut coeffs = Vec::with_capacity(k);
        coeffs.push(x);
        coeffs.extend(self::coeffs(x, k));
        ElementPolynomial { coeffs }
    }

    /// The polynomial's threshold, `k` (one more than its degree).
    pub fn k(&self) -> usize {
        self.coeffs.len()
    }

    /// Evaluates `f_x(alpha)` via Horner's method.
    pub fn eval(&self, alpha: Field) -> Field {
        let mut acc = *self.coeffs.last().expect("at least the constant term");
        for coeff in self.coeffs[..self.coeffs.len() - 1].iter().rev() {
            acc = acc.mul(alpha).add(*coeff);
        }
        acc
    }

    /// The constant term, `f_x(0) = x`.
    pub fn constant_term(&self) -> Field {
        self.coeffs[0]
    }
}

/// The public evaluation point assigned to party `i` (1-indexed), shared by
/// every party and every element: `alpha_i = hash_to_field(i)`.
pub fn evaluation_point(i: u64) -> Field {
    crate::field::hash_to_field(i)
}

/// Computes party `i`'s share of element `x` under threshold `k`:
/// `f_x(alpha_i)`.
pub fn share(x: Field, i: u64, k: usize) -> Field {
    ElementPolynomial::for_element(x, k).eval(evaluation_point(i))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lagrange;

    #[test]
    fn constant_term_matches_element() {
        let x = crate::field::hash_to_field(1234);
        let poly = ElementPolynomial::for_element(x, 5);
        assert_eq!(poly.constant_term(), x);
    }

    #[test]
    fn share_derivation_is_independent_of_party_index() {
        // The central correctness invariant: two distinct parties deriving
        // shares for the same x must be evaluating the *same* polynomial,
        // i.e. the coefficient vector (minus the constant term x) must not
        // depend on which party is asking.
        let x = crate::field::hash_to_field(77);
        let from_party_a = ElementPolynomial::for_element(x, 4);
        let from_party_b = ElementPolynomial::for_element(x, 4);
        assert_eq!(from_party_a.coeffs, from_party_b.coeffs);
    }

    #[test]
    fn k_shares_reconstruct_constant_term() {
        let k = 3;
        let x = crate::field::hash_to_field(555);
        let poly = ElementPolynomial::for_element(x, k);
        let points: Vec<(Field, Field)> = (1..=k as u64)
            .map(|i| {
                let alpha = evaluation_point(i);
                (alpha, poly.eval(alpha))
            })
            .collect();
        let recovered = lagrange::lagrange_at(&points, Field::ZERO);
        assert_eq!(recovered, x);
    }

    #[test]
    fn different_elements_yield_different_polynomials() {
        let a = ElementPolynomial::for_element(crate::field::hash_to_field(1), 4);
        let b = ElementPolynomial::for_element(crate::field::hash_to_field(2), 4);
        assert_ne!(a.coeffs, b.coeffs);
    }
}
