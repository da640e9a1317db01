use crate::scene::SceneGraph;

/// Single-body selection: selecting an already selected body clears it,
/// selecting another body replaces the previous selection. Returns whether
/// `body` ends up selected.
pub fn toggle_single(graph: &mut SceneGraph, body: usize) -> bool {
    let was_selected = graph.node(body).is_some_and(|n| n.selected);
    graph.clear_selection();
    if was_selected {
        return false;
    }
    graph.toggle_selected(body)
}
