use std::fmt::Debug;

use naia_serde::Serde;

/// Numeric fields closer than this compare equal for change detection
pub const FLOAT_EPSILON: f64 = 1e-2;

/// A value type that can live inside a `ReplicatedValue`. Beyond being
/// serializable, it defines the equality used for change detection: numbers
/// compare within `FLOAT_EPSILON`, composite values compare field by field.
pub trait Replicate: Serde + Debug + 'static {
    fn approx_eq(&self, other: &Self) -> bool;
}

impl Replicate for f32 {
    fn approx_eq(&self, other: &Self) -> bool {
        ((*self as f64) - (*other as f64)).abs() < FLOAT_EPSILON
    }
}

impl Replicate for f64 {
    fn approx_eq(&self, other: &Self) -> bool {
        (self - other).abs() < FLOAT_EPSILON
    }
}

macro_rules! impl_replicate_exact {
    ($($t:ty),*) => {
        $(
            impl Replicate for $t {
                fn approx_eq(&self, other: &Self) -> bool {
                    self == other
                }
            }
        )*
    };
}

impl_replicate_exact!(bool, u8, u16, u32, u64, i8, i16, i32, i64, String);

impl<T: Replicate> Replicate for Option<T> {
    fn approx_eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Some(a), Some(b)) => a.approx_eq(b),
            (None, None) => true,
            _ => false,
        }
    }
}

impl<T: Replicate> Replicate for Vec<T> {
    fn approx_eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().zip(other).all(|(a, b)| a.approx_eq(b))
    }
}

impl<T: Replicate, const N: usize> Replicate for [T; N] {
    fn approx_eq(&self, other: &Self) -> bool {
        self.iter().zip(other).all(|(a, b)| a.approx_eq(b))
    }
}

macro_rules! impl_replicate_tuple {
    ($($name:ident : $index:tt),+) => {
        impl<$($name: Replicate),+> Replicate for ($($name,)+) {
            fn approx_eq(&self, other: &Self) -> bool {
                true $(&& self.$index.approx_eq(&other.$index))+
            }
        }
    };
}

impl_replicate_tuple!(A: 0);
impl_replicate_tuple!(A: 0, B: 1);
impl_replicate_tuple!(A: 0, B: 1, C: 2);
impl_replicate_tuple!(A: 0, B: 1, C: 2, D: 3);
