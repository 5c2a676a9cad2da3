use std::borrow::Cow;
use std::fmt;

use crate::bail;
use crate::decode::FieldRule;
use crate::error::{ErrorKind, PipelineResult};
use crate::types::Record;

/// Decodes a [`Record`] into an entity of type `E`.
///
/// The target is reused across records, so implementations must overwrite every field they
/// own. A failure leaves the target in an unspecified but valid state.
pub trait Decoder<E>: Send + Sync + 'static {
    fn decode(&self, record: &Record, target: &mut E) -> PipelineResult<()>;
}

/// Assigns a validated field value to its slot in the entity.
pub type FieldSetter<E> = fn(&mut E, &str);

struct FieldSpec<E> {
    name: &'static str,
    rules: Vec<FieldRule>,
    setter: FieldSetter<E>,
}

/// Positional mapping from record fields to entity slots.
///
/// Record field `i` is validated with the rules of the `i`-th declared field and then assigned
/// through its setter. A record must carry exactly as many fields as the mapping declares.
pub struct FieldMapping<E> {
    fields: Vec<FieldSpec<E>>,
}

impl<E> FieldMapping<E> {
    pub fn builder() -> FieldMappingBuilder<E> {
        FieldMappingBuilder { fields: Vec::new() }
    }

    /// Returns the declared field names in positional order.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.fields.iter().map(|field| field.name)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<E> fmt::Debug for FieldMapping<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.fields.iter().map(|field| (field.name, &field.rules)))
            .finish()
    }
}

impl<E: 'static> Decoder<E> for FieldMapping<E> {
    fn decode(&self, record: &Record, target: &mut E) -> PipelineResult<()> {
        if record.len() != self.fields.len() {
            bail!(
                ErrorKind::FieldCountMismatch,
                "Record field count does not match the mapping",
                format!(
                    "line {}: expected {} fields, found {}",
                    record.line(),
                    self.fields.len(),
                    record.len()
                )
            );
        }

        for (field, value) in self.fields.iter().zip(record.fields()) {
            let mut value = Cow::Borrowed(value.as_str());
            for rule in &field.rules {
                value = rule.apply(value, field.name, record.line())?;
            }

            (field.setter)(target, &value);
        }

        Ok(())
    }
}

/// Builder of a [`FieldMapping`], declaring fields in positional order.
pub struct FieldMappingBuilder<E> {
    fields: Vec<FieldSpec<E>>,
}

impl<E> FieldMappingBuilder<E> {
    /// Declares the next positional field.
    pub fn field(mut self, name: &'static str, rules: &[FieldRule], setter: FieldSetter<E>) -> Self {
        self.fields.push(FieldSpec {
            name,
            rules: rules.to_vec(),
            setter,
        });
        self
    }

    pub fn build(self) -> FieldMapping<E> {
        FieldMapping {
            fields: self.fields,
        }
    }
}
