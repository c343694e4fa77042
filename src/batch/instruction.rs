use crate::batch::cursor::{BatchCursor, BatchRole};
use std::fmt::Write;

/// Instruction for the batch at the cursor's current index.
pub fn batch_instruction(cursor: &BatchCursor, context_window_chars: usize) -> String {
    let mut out = String::new();
    let whole = cursor.range_for(0);
    let _ = writeln!(
        out,
        "You are producing a {} in {} parts. Brief: {}",
        cursor.kind, cursor.total_batches, cursor.brief
    );
    let _ = writeln!(
        out,
        "This is part {} of {}.",
        cursor.current_index + 1,
        cursor.total_batches
    );

    match cursor.role() {
        BatchRole::Complete => {
            let _ = writeln!(
                out,
                "Write the complete {} covering units {} in full detail.",
                cursor.kind, whole
            );
        }
        BatchRole::Skeleton => {
            let _ = writeln!(
                out,
                "Write a complete skeleton spanning every unit {}: one short entry per unit \
                 establishing its place in the structure. Do not expand any unit in detail; \
                 later parts will expand them following this skeleton.",
                whole
            );
        }
        BatchRole::Expansion | BatchRole::Final => {
            let _ = writeln!(
                out,
                "Expand only units {} in full detail. Stay consistent with the skeleton and \
                 with everything written so far. Do not write other units.",
                cursor.range
            );
            if cursor.role() == BatchRole::Final {
                let _ = writeln!(
                    out,
                    "After the expansion, add a summary and an index covering all units {}.",
                    whole
                );
            }
            let context = cursor.trailing_context(context_window_chars);
            if !context.is_empty() {
                let _ = write!(out, "\n## Written so far (most recent part)\n{}\n", context);
            }
        }
    }

    out
}
