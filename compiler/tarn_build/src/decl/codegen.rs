//! Textual code units for declarations, and their verification.
//!
//! One unit per type, field, and function, in declaration order:
//!
//! ```text
//! geometry.Pair`2: type geometry.Pair`2 ; tparams 2
//! geometry.Pair`2.first: field geometry.Pair`2.first ; type #0
//! geometry.area(...): fun geometry.area(...) ; param w builtin.float ; ret (builtin.float)
//! ```

use tarn_symbols::{Qualifiers, SymbolId, SymbolKind, SymbolTable};

use super::collect::unknown_type;
use crate::frontend::{CodeUnit, Instruction};

/// Printed in place of an unresolved type.
const UNRESOLVED: &str = "?";

struct Printer<'t> {
    table: &'t SymbolTable,
    unknown: Option<SymbolId>,
}

impl Printer<'_> {
    /// Type text with the unresolved placeholder printed as `?` wherever it
    /// occurs as a type argument.
    fn type_text(&self, ty: Option<SymbolId>) -> String {
        let Some(ty) = ty.filter(|&ty| Some(ty) != self.unknown) else {
            return UNRESOLVED.to_string();
        };
        let symbol = self.table.get(ty);
        if !symbol.is_specialized() {
            return symbol.full_name().to_string();
        }
        let args: Vec<String> = symbol
            .type_args
            .iter()
            .enumerate()
            .map(|(i, &arg)| match symbol.tuple_names.get(i).filter(|n| !n.is_empty()) {
                Some(label) => format!("{label} {}", self.type_text(Some(arg))),
                None => self.type_text(Some(arg)),
            })
            .collect();
        let args = args.join(",");
        if symbol.parent == self.table.tuple_root() {
            return format!("({args})");
        }
        let generic = self.table.get(symbol.parent);
        if generic.parent == SymbolId::ROOT {
            format!("{}<{args}>", generic.name)
        } else {
            let owner = self.table.full_name(generic.parent);
            format!("{owner}.{}<{args}>", generic.name)
        }
    }

    fn children(&self, id: SymbolId) -> Vec<SymbolId> {
        let mut children: Vec<SymbolId> = self.table.get(id).child_ids().collect();
        children.sort_by_key(|&child| self.table.get(child).ordinal());
        children
    }

    fn unit(&self, id: SymbolId) -> Option<CodeUnit> {
        let symbol = self.table.get(id);
        let site = symbol.site;
        let full_name = symbol.full_name();
        let mut instructions = Vec::new();
        match symbol.kind {
            SymbolKind::Type => {
                instructions.push(Instruction::new(format!("type {full_name}"), site));
                instructions.push(Instruction::new(
                    format!("tparams {}", symbol.generic_params.len()),
                    site,
                ));
            }
            SymbolKind::Field => {
                instructions.push(Instruction::new(format!("field {full_name}"), site));
                instructions.push(Instruction::new(
                    format!("type {}", self.type_text(symbol.type_ref)),
                    site,
                ));
            }
            SymbolKind::Function => {
                instructions.push(Instruction::new(format!("fun {full_name}"), site));
                for param in self.children(id) {
                    let param = self.table.get(param);
                    if param.kind != SymbolKind::FunctionParam {
                        continue;
                    }
                    let text = format!("param {} {}", param.name, self.type_text(param.type_ref));
                    instructions.push(Instruction::new(text, param.site));
                }
                let returns = self.table.function_returns(id);
                instructions.push(Instruction::new(
                    format!("ret {}", self.type_text(returns)),
                    site,
                ));
                if let Some(requires) = &symbol.requires {
                    instructions.push(Instruction::new(format!("req {requires}"), site));
                }
            }
            _ => return None,
        }
        Some(CodeUnit {
            name: full_name.to_string(),
            site,
            instructions,
        })
    }
}

/// Code units for every user module, in declaration order.
#[tracing::instrument(level = "debug", skip_all)]
pub fn generate(table: &SymbolTable) -> Vec<CodeUnit> {
    let printer = Printer {
        table,
        unknown: unknown_type(table),
    };
    let mut units = Vec::new();
    for module in printer.children(SymbolId::ROOT) {
        let symbol = table.get(module);
        if symbol.kind != SymbolKind::Module || symbol.qualifiers.contains(Qualifiers::EXTERN) {
            continue;
        }
        for member in printer.children(module) {
            units.extend(printer.unit(member));
            if table.get(member).kind == SymbolKind::Type {
                units.extend(
                    printer
                        .children(member)
                        .into_iter()
                        .filter_map(|child| printer.unit(child)),
                );
            }
        }
    }
    units
}

/// Failing instructions of `unit`: unresolved types, and require clauses
/// that do not start with a parameter name.
pub fn verify(unit: &CodeUnit) -> Vec<(usize, String)> {
    let params: Vec<&str> = unit
        .instructions
        .iter()
        .filter_map(|i| i.text.strip_prefix("param "))
        .filter_map(|rest| rest.split_whitespace().next())
        .collect();
    let mut failures = Vec::new();
    for (index, instruction) in unit.instructions.iter().enumerate() {
        let text = &instruction.text;
        if let Some(clause) = text.strip_prefix("req ") {
            let subject = clause.split_whitespace().next().unwrap_or_default();
            if !params.contains(&subject) {
                let message = format!("`{subject}` is not a parameter of `{}`", unit.name);
                failures.push((index, message));
            }
        } else if text
            .split(|c: char| c.is_whitespace() || ",()<>".contains(c))
            .any(|word| word == UNRESOLVED)
        {
            failures.push((index, format!("Unresolved type in `{text}`")));
        }
    }
    failures
}
