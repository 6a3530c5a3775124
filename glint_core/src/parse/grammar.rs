use super::{decl, Parser};
use crate::intermediate::{grow_aggregate, set_aggregate_operator};
use crate::ir::{Node, Op};
use crate::token::T;

/// External declarations until end of file.
/// A declaration with a syntax error is skipped up to its `;` or
/// closing `}` and parsing continues with the next one.
pub(super) fn translation_unit(p: &mut Parser) -> Option<Node> {
    let start = p.loc();
    let mut root = None;
    while !p.at(T![eof]) {
        let mark = p.mark();
        let loc = p.loc();
        match decl::declaration(p, true) {
            Ok(node) => root = grow_aggregate(root, node, loc),
            Err(expected) => {
                p.syntax_error(&expected);
                p.recover(mark, true);
            }
        }
    }
    root.map(|root| set_aggregate_operator(Some(root), Op::Sequence, start))
}
