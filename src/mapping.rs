//! Column selection for bulk writes
//!
//! Decides which of an entity's columns take part in a write. Explicit member
//! lists override the structural defaults (computed and shadow members,
//! identity columns, row versions) but never the hard exclusions: columns the
//! store generates itself, and columns whose value the objects cannot supply.

use tracing::debug;

use crate::entity::{ColumnDescriptor, EntityType};
use crate::error::{BulkError, Result};
use crate::options::MappingOptions;

/// Resolve the ordered columns written for `entity` under `options`
pub fn resolve_columns<'a, T>(
    entity: &'a EntityType<T>,
    options: &MappingOptions,
) -> Result<Vec<&'a ColumnDescriptor<T>>> {
    if let Some(members) = &options.explicit_members {
        let mut unknown: Vec<_> = members
            .iter()
            .filter(|m| !entity.knows_member(m))
            .map(|m| m.as_str())
            .collect();
        if !unknown.is_empty() {
            unknown.sort_unstable();
            return Err(BulkError::configuration(format!(
                "Unknown members requested for bulk write: {}",
                unknown.join(", ")
            )));
        }
    }

    let mut resolved = Vec::with_capacity(entity.columns().len());
    for col in entity.columns() {
        if col.is_store_generated || !col.accessor.is_readable() {
            let requested = options
                .explicit_members
                .as_ref()
                .is_some_and(|members| members.contains(col.member()));
            if requested {
                debug!(column = %col.name, "Explicitly requested column cannot be written, skipping");
            }
            continue;
        }

        let included = match &options.explicit_members {
            Some(members) => members.contains(col.member()),
            None => {
                col.accessor.is_writable()
                    && (!col.is_auto_increment || options.keep_identity)
                    && (!col.is_concurrency_token || options.include_row_version)
            }
        };

        if included {
            resolved.push(col);
        }
    }

    Ok(resolved)
}
