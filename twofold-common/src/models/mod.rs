use std::fmt;

// Maps an enum stored as TEXT to and from its `as_str()`/`FromStr` representation
macro_rules! text_enum_sql {
    ($enum_type:ty) => {
        impl diesel::serialize::ToSql<diesel::sql_types::Text, diesel::pg::Pg> for $enum_type {
            fn to_sql<'b>(
                &'b self,
                out: &mut diesel::serialize::Output<'b, '_, diesel::pg::Pg>,
            ) -> diesel::serialize::Result {
                use std::io::Write;

                out.write_all(self.as_str().as_bytes())?;
                Ok(diesel::serialize::IsNull::No)
            }
        }

        impl diesel::deserialize::FromSql<diesel::sql_types::Text, diesel::pg::Pg> for $enum_type {
            fn from_sql(bytes: diesel::pg::PgValue<'_>) -> diesel::deserialize::Result<Self> {
                let value = std::str::from_utf8(bytes.as_bytes())?;
                value
                    .parse::<$enum_type>()
                    .map_err(|e| e.to_string().into())
            }
        }
    };
}

pub mod category;
pub mod job_registry_item;
pub mod list;
pub mod list_item;
pub mod partner_invitation;
pub mod partnership;
pub mod transaction;
pub mod user;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnknownVariant {
    pub type_name: &'static str,
    pub value: String,
}

impl std::error::Error for UnknownVariant {}

impl fmt::Display for UnknownVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Unrecognized {} '{}'", self.type_name, self.value)
    }
}
