//! Record identifiers
//!
//! Repositories are generic over the primary key type. `UniversalId` is the
//! erased form used for identity-cache keys, log fields and error messages.

use std::fmt::{self, Display};
use uuid::Uuid;

/// Primary key with its concrete type erased
///
/// All integer widths collapse into `Numeric`, so `7i32` and `7i64` name the
/// same record.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum UniversalId {
    Numeric(i64),
    Uuid(Uuid),
    String(String),
}

impl Display for UniversalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UniversalId::Numeric(n) => n.fmt(f),
            UniversalId::Uuid(uuid) => uuid.fmt(f),
            UniversalId::String(s) => f.write_str(s),
        }
    }
}

/// Primary key types usable with the stores
pub trait HasUniversalId {
    fn universal_id(&self) -> UniversalId;
}

macro_rules! numeric_id {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for UniversalId {
                fn from(id: $ty) -> Self {
                    UniversalId::Numeric(i64::from(id))
                }
            }

            impl HasUniversalId for $ty {
                fn universal_id(&self) -> UniversalId {
                    UniversalId::from(*self)
                }
            }
        )*
    };
}

numeric_id!(i16, i32, i64, u16, u32);

impl From<Uuid> for UniversalId {
    fn from(id: Uuid) -> Self {
        UniversalId::Uuid(id)
    }
}

impl From<String> for UniversalId {
    fn from(id: String) -> Self {
        UniversalId::String(id)
    }
}

impl HasUniversalId for Uuid {
    fn universal_id(&self) -> UniversalId {
        UniversalId::Uuid(*self)
    }
}

impl HasUniversalId for String {
    fn universal_id(&self) -> UniversalId {
        UniversalId::String(self.clone())
    }
}
