//! Lagrange interpolation over GF(2^128).
//!
//! Subtraction equals addition equals XOR in a binary field, so the usual
//! Lagrange basis polynomial specializes to
//! `L_i(x) = prod_{j != i} (x ^ x_j) * inv(x_i ^ x_j)`.

use crate::field::Field;

/// Evaluates the unique degree-`(n-1)` polynomial through `points` at `x`.
///
/// # Panics
/// Panics if any two points share an abscissa (the resulting `inv` of zero
/// would silently return zero rather than signal the caller's logic error).
pub fn lagrange_at(points: &[(Field, Field)], x: Field) -> Field {
    let mut acc = Field::ZERO;
    for (idx, &(xi, yi)) in points.iter().enumerate() {
        let mut li = Field::ONE;
        for (jdx, &(xj, _)) in points.iter().enumerate() {
            if idx == jdx {
                continue;
            }
            let denom = xi.add(xj);
            assert!(
                !denom.is_zero(),
                "lagrange_at requires distinct abscissae"
            );
            let numer = x.add(xj);
            li = li.mul(numer).mul(denom.inv());
        }
        acc = acc.add(yi.mul(li));
    }
    acc
}
