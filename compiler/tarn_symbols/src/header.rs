//! Public-symbol records for the header document.

use serde::{Deserialize, Serialize};

use crate::symbol::{Qualifiers, SymbolId, SymbolKind};
use crate::table::SymbolTable;

/// One exported symbol and the exported symbols nested in it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderSymbol {
    pub name: String,
    /// Kind followed by qualifiers, lowercase.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub comments: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub symbols: Vec<HeaderSymbol>,
    /// Resolved type; for functions, the return tuple.
    #[serde(rename = "type", default, skip_serializing_if = "String::is_empty")]
    pub type_name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub constraints: Vec<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub requires: String,
}

impl SymbolTable {
    /// Records for every module with at least one exported member.
    ///
    /// `EXTERN` modules (the built-ins) are left out. Inside a module only
    /// `pub` symbols are exported, together with the parameters of exported
    /// types and functions.
    pub fn header_symbols(&self) -> Vec<HeaderSymbol> {
        self.sorted_children(SymbolId::ROOT)
            .into_iter()
            .filter(|&id| {
                let symbol = self.get(id);
                symbol.kind == SymbolKind::Module && !symbol.qualifiers.contains(Qualifiers::EXTERN)
            })
            .map(|id| self.header_record(id))
            .filter(|record| !record.symbols.is_empty())
            .collect()
    }

    fn header_record(&self, id: SymbolId) -> HeaderSymbol {
        let symbol = self.get(id);
        let type_name = match symbol.kind {
            SymbolKind::Function => self.function_returns(id),
            _ => symbol.type_ref,
        }
        .map(|ty| self.full_name(ty).to_string())
        .unwrap_or_default();
        HeaderSymbol {
            name: symbol.full_name().to_string(),
            tags: std::iter::once(symbol.kind.to_string())
                .chain(symbol.qualifiers.tags())
                .collect(),
            comments: symbol.comments.join("\n"),
            symbols: self
                .sorted_children(id)
                .into_iter()
                .filter(|&child| self.is_exported(child))
                .map(|child| self.header_record(child))
                .collect(),
            type_name,
            constraints: symbol.constraints.clone(),
            requires: symbol.requires.clone().unwrap_or_default(),
        }
    }

    fn is_exported(&self, id: SymbolId) -> bool {
        let symbol = self.get(id);
        symbol.is_pub()
            || matches!(
                symbol.kind,
                SymbolKind::TypeParam | SymbolKind::FunctionParam | SymbolKind::TupleParam
            )
    }

    /// Children in declaration order.
    fn sorted_children(&self, id: SymbolId) -> Vec<SymbolId> {
        let mut children: Vec<SymbolId> = self.get(id).child_ids().collect();
        children.sort_by_key(|&child| self.get(child).ordinal());
        children
    }
}

#[cfg(test)]
#[expect(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]
mod tests;
