//! JSON export of a parsed game tree for inspection tooling.

use serde_json::Value as JsonValue;

use crate::builder::ParsedGame;
use crate::tree::{GameTree, Node};

/// Whole parse result: nested tree, main line and diagnostics.
pub fn game_to_json<P>(game: &ParsedGame<P>) -> JsonValue {
    serde_json::json!({
        "mainLine": game.tree.main_line_san(),
        "nodes": game.tree.len(),
        "tree": tree_to_json(&game.tree),
        "diagnostics": game.diagnostics,
    })
}

/// Nested `{ move, comment, mainLine, children }` objects starting at the
/// root. Built bottom-up without recursion: a child always has a larger id
/// than its parent.
pub fn tree_to_json<P>(tree: &GameTree<P>) -> JsonValue {
    let nodes: Vec<&Node<P>> = tree.nodes().collect();
    let mut built: Vec<Option<JsonValue>> = vec![None; nodes.len()];

    for node in nodes.iter().rev() {
        let children: Vec<JsonValue> = tree
            .ordered_children(node.id)
            .into_iter()
            .filter_map(|child| built.get_mut(child.index()).and_then(Option::take))
            .collect();
        built[node.id.index()] = Some(node_to_json(node, children));
    }

    built
        .into_iter()
        .next()
        .flatten()
        .unwrap_or(JsonValue::Null)
}

fn node_to_json<P>(node: &Node<P>, children: Vec<JsonValue>) -> JsonValue {
    let Some(mv) = node.mv.as_ref() else {
        return serde_json::json!({
            "move": "start",
            "comment": node.comment,
            "mainLine": true,
            "children": children,
        });
    };

    serde_json::json!({
        "id": node.id,
        "move": mv.san,
        "written": mv.written,
        "moveNumber": node.move_number(),
        "side": node.mover(),
        "glyph": mv.glyph.map(|g| g.as_str()),
        "comment": node.comment,
        "mainLine": node.is_main_line,
        "resolution": node.resolution,
        "offset": mv.offset,
        "children": children,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse;

    #[test]
    fn test_tree_to_json_nests_main_line_first() {
        let game = parse("1.e4 e5 Instead, 1...c5!").unwrap();
        let json = tree_to_json(&game.tree);

        assert_eq!(json["move"], "start");
        let e4 = &json["children"][0];
        assert_eq!(e4["move"], "e4");
        assert_eq!(e4["side"], "White");
        assert_eq!(e4["children"][0]["move"], "e5");
        assert_eq!(e4["children"][0]["comment"], "Instead,");
        assert_eq!(e4["children"][0]["mainLine"], true);
        assert_eq!(e4["children"][1]["move"], "c5");
        assert_eq!(e4["children"][1]["glyph"], "!");
        assert_eq!(e4["children"][1]["mainLine"], false);
    }

    #[test]
    fn test_game_to_json_reports_diagnostics() {
        let game = parse("1.e4 e5 2.Ke3").unwrap();
        let json = game_to_json(&game);
        assert_eq!(json["mainLine"], serde_json::json!(["e4", "e5"]));
        assert_eq!(json["nodes"], 3);
        assert_eq!(json["diagnostics"][0]["kind"], "Unparseable");
        assert_eq!(json["diagnostics"][0]["token"], "2.Ke3");
    }
}
