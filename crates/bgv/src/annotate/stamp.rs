//! Appends value stamps to node labels.

use crate::annotate::{Annotator, AnnotatorOptions};
use crate::error::AnnotateError;
use crate::model::Graph;

const STAMP_PROP: &str = "stamp";

#[derive(Debug, Clone, Copy, Default)]
pub struct StampAnnotator;

impl Annotator for StampAnnotator {
    fn name(&self) -> &'static str {
        "stamp"
    }

    fn applies(&self, _graph: &Graph) -> bool {
        true
    }

    fn annotate(&self, graph: &mut Graph, options: &AnnotatorOptions) -> Result<(), AnnotateError> {
        if !options.show_stamps {
            return Ok(());
        }
        for node in graph.nodes_mut() {
            let Some(stamp) = node.prop(STAMP_PROP).map(ToString::to_string) else {
                continue;
            };
            // Rebuild from the base label so repeated runs don't stack stamps.
            let base = match &node.display.base_label {
                Some(base) => base.clone(),
                None => {
                    let base = node.label();
                    node.display.base_label = Some(base.clone());
                    base
                }
            };
            node.display.label = Some(format!("{base}\n{stamp}"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Props, Value};

    fn stamped() -> Graph {
        let mut graph = Graph::new();
        let mut props = Props::new();
        props.insert(STAMP_PROP.to_string(), Value::from("i32 [0 - 10]"));
        graph.create_node(0, None, props).unwrap().display.label = Some("Phi".to_string());
        graph.create_node(1, None, Props::new()).unwrap().display.label = Some("Begin".to_string());
        graph
    }

    #[test]
    fn test_appends_stamp() {
        let mut graph = stamped();
        let options = AnnotatorOptions::new().show_stamps(true);
        StampAnnotator.annotate(&mut graph, &options).unwrap();
        StampAnnotator.annotate(&mut graph, &options).unwrap();
        assert_eq!(graph.node(0).unwrap().display.label.as_deref(), Some("Phi\ni32 [0 - 10]"));
        assert_eq!(graph.node(1).unwrap().display.label.as_deref(), Some("Begin"));
    }

    #[test]
    fn test_disabled_by_default() {
        let mut graph = stamped();
        StampAnnotator.annotate(&mut graph, &AnnotatorOptions::default()).unwrap();
        assert_eq!(graph.node(0).unwrap().display.label.as_deref(), Some("Phi"));
    }
}
