//! Random constants for primitive, boxed and string parameters

use rand::seq::SliceRandom;
use rand::Rng;

use crate::cluster::{PrimitiveType, Type};
use crate::program::Literal;

/// Probability of drawing a boundary value instead of a small one
const BOUNDARY_PROBABILITY: f64 = 0.1;

/// Largest magnitude of an ordinary numeric constant
const SMALL_RANGE: i64 = 100;

/// Largest change applied when perturbing a numeric constant
const MAX_DELTA: i64 = 20;

/// Upper bound on generated string length
const MAX_STRING_LENGTH: usize = 8;

const STRING_POOL: [&str; 4] = ["", "a", "test", "0"];

fn boundaries(p: PrimitiveType) -> Vec<i64> {
    let (min, max) = match p {
        PrimitiveType::Byte => (i64::from(i8::MIN), i64::from(i8::MAX)),
        PrimitiveType::Short => (i64::from(i16::MIN), i64::from(i16::MAX)),
        PrimitiveType::Long => (i64::MIN, i64::MAX),
        _ => (i64::from(i32::MIN), i64::from(i32::MAX)),
    };
    vec![0, 1, -1, min, max]
}

fn clamp_integral(p: PrimitiveType, value: i64) -> i64 {
    let bounds = boundaries(p);
    value.clamp(bounds[3], bounds[4])
}

fn random_char<R: Rng + ?Sized>(rng: &mut R) -> char {
    char::from(rng.gen_range(b'a'..=b'z'))
}

fn other_char<R: Rng + ?Sized>(current: char, rng: &mut R) -> char {
    let c = random_char(rng);
    if c != current {
        c
    } else if c == 'z' {
        'a'
    } else {
        char::from_u32(u32::from(c) + 1).unwrap_or('a')
    }
}

fn random_string<R: Rng + ?Sized>(rng: &mut R) -> String {
    if rng.gen_bool(0.5) {
        if let Some(s) = STRING_POOL.choose(rng) {
            return (*s).to_string();
        }
    }
    let length = rng.gen_range(0..=MAX_STRING_LENGTH);
    (0..length).map(|_| random_char(rng)).collect()
}

fn random_primitive<R: Rng + ?Sized>(p: PrimitiveType, rng: &mut R) -> Literal {
    match p {
        PrimitiveType::Boolean => Literal::Bool(rng.gen_bool(0.5)),
        PrimitiveType::Char => Literal::Char(random_char(rng)),
        PrimitiveType::Float | PrimitiveType::Double => {
            if rng.gen_bool(BOUNDARY_PROBABILITY) {
                let pool = [0.0, 1.0, -1.0, f64::MAX, f64::MIN_POSITIVE];
                Literal::Float(*pool.choose(rng).unwrap_or(&0.0))
            } else {
                let bound = SMALL_RANGE as f64;
                Literal::Float(rng.gen_range(-bound..bound))
            }
        }
        integral => {
            if rng.gen_bool(BOUNDARY_PROBABILITY) {
                let pool = boundaries(integral);
                Literal::Int(*pool.choose(rng).unwrap_or(&0))
            } else {
                Literal::Int(rng.gen_range(-SMALL_RANGE..=SMALL_RANGE))
            }
        }
    }
}

/// Random constant of `ty`, or `None` if `ty` has no literal form
///
/// Primitives, boxed primitives and strings have literals.
pub fn random_literal<R: Rng + ?Sized>(ty: &Type, rng: &mut R) -> Option<Literal> {
    match ty {
        Type::Primitive(p) => Some(random_primitive(*p, rng)),
        _ if ty.is_string() => Some(Literal::Str(random_string(rng))),
        _ => ty.unboxed().map(|p| random_primitive(p, rng)),
    }
}

/// Small random change to a constant of `ty`
///
/// Numbers move by a bounded delta, booleans flip, characters and
/// strings are redrawn or edited. `null` stays `null`.
pub fn perturb<R: Rng + ?Sized>(value: &Literal, ty: &Type, rng: &mut R) -> Literal {
    let primitive = match ty {
        Type::Primitive(p) => Some(*p),
        _ => ty.unboxed(),
    };
    match value {
        Literal::Null => Literal::Null,
        Literal::Bool(b) => Literal::Bool(!b),
        Literal::Int(i) => {
            let mut delta = rng.gen_range(-MAX_DELTA..=MAX_DELTA);
            if delta == 0 {
                delta = 1;
            }
            let shifted = i.saturating_add(delta);
            Literal::Int(primitive.map_or(shifted, |p| clamp_integral(p, shifted)))
        }
        Literal::Float(f) => Literal::Float(f + rng.gen_range(-1.0..1.0) * MAX_DELTA as f64),
        Literal::Char(_) => Literal::Char(random_char(rng)),
        Literal::Str(s) => Literal::Str(perturb_string(s, rng)),
    }
}

fn perturb_string<R: Rng + ?Sized>(s: &str, rng: &mut R) -> String {
    let mut chars: Vec<char> = s.chars().collect();
    match rng.gen_range(0..3) {
        0 if !chars.is_empty() => {
            let at = rng.gen_range(0..chars.len());
            chars.remove(at);
        }
        1 if !chars.is_empty() => {
            let at = rng.gen_range(0..chars.len());
            chars[at] = other_char(chars[at], rng);
        }
        _ => {
            let at = rng.gen_range(0..=chars.len());
            chars.insert(at, random_char(rng));
        }
    }
    chars.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;

    #[test]
    fn test_literal_kinds_follow_type() {
        let mut rng = StdRng::seed_from_u64(3);
        assert!(matches!(
            random_literal(&Type::boolean(), &mut rng),
            Some(Literal::Bool(_))
        ));
        assert!(matches!(
            random_literal(&Type::string(), &mut rng),
            Some(Literal::Str(_))
        ));
        assert!(matches!(
            random_literal(&Type::class("Integer"), &mut rng),
            Some(Literal::Int(_))
        ));
        assert!(matches!(
            random_literal(&"double".parse().expect("type"), &mut rng),
            Some(Literal::Float(_))
        ));
        assert!(random_literal(&Type::class("Stack"), &mut rng).is_none());
    }

    #[test]
    fn test_byte_literals_fit() {
        let mut rng = StdRng::seed_from_u64(11);
        let byte: Type = "byte".parse().expect("type");
        for _ in 0..200 {
            match random_literal(&byte, &mut rng) {
                Some(Literal::Int(i)) => assert!(i8::try_from(i).is_ok()),
                other => panic!("unexpected literal {other:?}"),
            }
        }
    }

    #[test]
    fn test_perturb_changes_value() {
        let mut rng = StdRng::seed_from_u64(5);
        assert_eq!(perturb(&Literal::Bool(true), &Type::boolean(), &mut rng), Literal::Bool(false));
        assert_ne!(perturb(&Literal::Int(7), &Type::int(), &mut rng), Literal::Int(7));
        assert_eq!(perturb(&Literal::Null, &Type::string(), &mut rng), Literal::Null);
        let Literal::Str(edited) = perturb(&Literal::Str("abc".into()), &Type::string(), &mut rng)
        else {
            panic!("string should stay a string");
        };
        assert_ne!(edited, "abc");
    }

    #[test]
    fn test_perturb_clamps_to_range() {
        let mut rng = StdRng::seed_from_u64(9);
        let byte: Type = "byte".parse().expect("type");
        for _ in 0..50 {
            let Literal::Int(i) = perturb(&Literal::Int(127), &byte, &mut rng) else {
                panic!("int expected");
            };
            assert!(i <= 127);
        }
    }
}
