//! Field resolution: turning a record's declared fields into the ordered list of
//! wire names and access paths used by every encode and decode of that type.

use crate::{
    encoding::{Decode, Encode, Mode},
    errors::{Error, Result},
    record::{RecordFields, RecordInfo},
};
use smallvec::SmallVec;
use std::{any::TypeId, collections::HashMap};

/// A parsed `#[msgpack(tag = "...")]` value.
///
/// The text before the first comma renames the field, the remaining
/// comma-separated options modify it. The exact tag `"-"` excludes the field.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct FieldTag {
    pub name: Option<&'static str>,
    pub ignore: bool,
    pub omit_empty: bool,
}

impl FieldTag {
    pub fn parse(tag: &'static str) -> Self {
        if tag == "-" {
            return FieldTag {
                ignore: true,
                ..FieldTag::default()
            };
        }
        let mut parts = tag.split(',');
        let name = parts.next().filter(|n| !n.is_empty());
        let omit_empty = parts.any(|opt| opt.trim() == "omitempty");
        FieldTag {
            name,
            ignore: false,
            omit_empty,
        }
    }
}

/// Access path: field indices through embedded records, ending at the field itself.
pub type Path = SmallVec<[usize; 4]>;

/// One resolved field.
#[derive(Clone, Debug, PartialEq)]
pub struct FieldDescriptor {
    name: &'static str,
    path: Path,
    omit_empty: bool,
}

impl FieldDescriptor {
    /// The wire name.
    pub fn name(&self) -> &'static str { self.name }

    pub fn path(&self) -> &[usize] { &self.path }

    pub fn omit_empty(&self) -> bool { self.omit_empty }

    /// Follows the path to the field's value.
    ///
    /// Returns `None` when an embedded record along the path is absent.
    pub fn lookup<'r>(&self, record: &'r dyn RecordFields) -> Option<&'r dyn Encode> {
        let (last, prefix) = self.path.split_last()?;
        let mut current = record;
        for i in prefix {
            current = current.embedded(*i)?;
        }
        current.field(*last)
    }

    /// Like [`FieldDescriptor::lookup`], but also `None` for a zero value the field
    /// is tagged to omit.
    pub fn present<'r>(&self, record: &'r dyn RecordFields) -> Option<&'r dyn Encode> {
        self.lookup(record)
            .filter(|value| !(self.omit_empty && value.is_zero()))
    }

    /// Follows the path for writing, allocating absent embedded records.
    pub fn lookup_mut<'r>(&self, record: &'r mut dyn RecordFields) -> Result<&'r mut dyn Decode> {
        let (last, prefix) = self
            .path
            .split_last()
            .ok_or_else(|| Error::receiver(format!("field `{}` has an empty path", self.name)))?;
        let mut current = record;
        for i in prefix {
            current = current
                .embedded_mut(*i)
                .ok_or_else(|| Error::receiver(format!("no embedded record at index {} for `{}`", i, self.name)))?;
        }
        current
            .field_mut(*last)
            .ok_or_else(|| Error::receiver(format!("field `{}` is not writable", self.name)))
    }
}

/// The resolved, immutable field layout of one record type in one mode.
#[derive(Debug)]
pub struct RecordLayout {
    type_name: &'static str,
    fields: Vec<FieldDescriptor>,
    never_omits: bool,
    by_name: Option<HashMap<&'static str, usize>>,
}

impl RecordLayout {
    /// Resolves the layout of the record described by `info`.
    pub fn resolve(info: &RecordInfo, mode: Mode) -> Self {
        let mut visiting = vec![info.type_id];
        let candidates = collect(info, &Path::new(), &mut visiting);

        let fields = drop_conflicts(info.name, candidates);
        let never_omits = fields.iter().all(|f| !f.omit_empty && f.path.len() == 1);
        let by_name = match mode {
            Mode::Map => Some(fields.iter().enumerate().map(|(i, f)| (f.name, i)).collect()),
            Mode::Array => None,
        };

        RecordLayout {
            type_name: info.name,
            fields,
            never_omits,
            by_name,
        }
    }

    /// Name of the record type, for diagnostics.
    pub fn type_name(&self) -> &'static str { self.type_name }

    pub fn fields(&self) -> &[FieldDescriptor] { &self.fields }

    pub fn len(&self) -> usize { self.fields.len() }

    pub fn is_empty(&self) -> bool { self.fields.is_empty() }

    /// True when every field is direct and none is tagged `omitempty`, so a map
    /// encode can write the header without counting.
    pub fn never_omits(&self) -> bool { self.never_omits }

    /// Index of the field with wire name `name`.
    pub fn position(&self, name: &str) -> Option<usize> {
        match &self.by_name {
            Some(by_name) => by_name.get(name).copied(),
            None => self.fields.iter().position(|f| f.name == name),
        }
    }
}

/// Lists the fields of `info` under `prefix`: its own fields first, then the fields
/// of each anonymously embedded record in declaration order.
fn collect(info: &RecordInfo, prefix: &Path, visiting: &mut Vec<TypeId>) -> Vec<FieldDescriptor> {
    let mut primary = Vec::new();
    let mut embedded = Vec::new();
    for (index, decl) in info.fields.iter().enumerate() {
        if !decl.public {
            continue;
        }
        let tag = decl.tag.map(FieldTag::parse).unwrap_or_default();
        if tag.ignore {
            continue;
        }

        let mut path = prefix.clone();
        path.push(index);

        match (decl.embed, tag.name) {
            (Some(embed), None) => {
                let inner = embed();
                // only reachable through a type that embeds itself via Box or Option
                if visiting.contains(&inner.type_id) {
                    continue;
                }
                visiting.push(inner.type_id);
                embedded.extend(collect(&inner, &path, visiting));
                visiting.pop();
            }
            (_, name) => primary.push(FieldDescriptor {
                name: name.unwrap_or(decl.name),
                path,
                omit_empty: tag.omit_empty,
            }),
        }
    }
    primary.extend(embedded);
    primary
}

/// Keeps, for each wire name, the unique shallowest candidate. Names with several
/// candidates at the shallowest depth are dropped.
fn drop_conflicts(record: &'static str, candidates: Vec<FieldDescriptor>) -> Vec<FieldDescriptor> {
    let mut shallowest: HashMap<&'static str, (usize, usize)> = HashMap::new();
    for f in &candidates {
        let depth = f.path.len();
        shallowest
            .entry(f.name)
            .and_modify(|(best, count)| {
                if depth < *best {
                    *best = depth;
                    *count = 1;
                } else if depth == *best {
                    *count += 1;
                }
            })
            .or_insert((depth, 1));
    }

    candidates
        .into_iter()
        .filter(|f| {
            let (best, count) = shallowest[f.name];
            if f.path.len() != best {
                return false;
            }
            if count > 1 {
                tracing::trace!(record, field = f.name, depth = best, "dropping ambiguous field");
                return false;
            }
            true
        })
        .collect()
}
