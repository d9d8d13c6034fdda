//! Explicit filter-graph structure.
//!
//! The graph is held as chains with typed input references and named output
//! labels, and referential integrity is validated before anything is
//! serialized to text. ffmpeg has no static check of its own: a single
//! misreferenced label kills the whole invocation at run time, so the
//! validator enforces the invariants up front:
//!
//! - every output label is produced exactly once
//! - every referenced label was produced by an earlier chain
//! - every label is consumed at most once (no implicit stream reuse; fan-out
//!   would need an explicit split node, which this editor never emits)

use thiserror::Error;

use crate::models::TimelineKind;

/// Validation errors for a filter graph.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum GraphError {
    #[error("Label '[{0}]' referenced but never produced by an earlier chain")]
    UndefinedLabel(String),

    #[error("Label '[{0}]' produced more than once")]
    DuplicateProducer(String),

    #[error("Label '[{0}]' consumed more than once (stream reuse requires an explicit split)")]
    LabelReused(String),

    #[error("Graph has no chains")]
    Empty,
}

/// Reference to a stream entering a chain: either a raw input-file stream or
/// a label produced earlier in the graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamRef {
    Source {
        file_index: usize,
        kind: TimelineKind,
    },
    Label(String),
}

impl StreamRef {
    pub fn video(file_index: usize) -> Self {
        StreamRef::Source {
            file_index,
            kind: TimelineKind::Video,
        }
    }

    pub fn audio(file_index: usize) -> Self {
        StreamRef::Source {
            file_index,
            kind: TimelineKind::Audio,
        }
    }

    pub fn label(name: impl Into<String>) -> Self {
        StreamRef::Label(name.into())
    }
}

impl std::fmt::Display for StreamRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StreamRef::Source { file_index, kind } => {
                let tag = match kind {
                    TimelineKind::Video => "v",
                    TimelineKind::Audio => "a",
                };
                write!(f, "[{}:{}]", file_index, tag)
            }
            StreamRef::Label(name) => write!(f, "[{}]", name),
        }
    }
}

/// One filter-chain statement: ordered inputs, a filter body, ordered
/// output labels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterChain {
    pub inputs: Vec<StreamRef>,
    pub body: String,
    pub outputs: Vec<String>,
}

/// The whole graph, in emission order.
#[derive(Debug, Clone, Default)]
pub struct FilterGraph {
    chains: Vec<FilterChain>,
}

impl FilterGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.chains.is_empty()
    }

    pub fn chains(&self) -> &[FilterChain] {
        &self.chains
    }

    /// Append a chain.
    pub fn add(
        &mut self,
        inputs: Vec<StreamRef>,
        body: impl Into<String>,
        outputs: Vec<String>,
    ) {
        self.chains.push(FilterChain {
            inputs,
            body: body.into(),
            outputs,
        });
    }

    /// Rename a label throughout the graph (producer and consumers).
    ///
    /// Used to pin the terminal labels to their mapped names once the last
    /// compilation phase is known.
    pub fn rename_label(&mut self, from: &str, to: &str) {
        for chain in &mut self.chains {
            for input in &mut chain.inputs {
                if let StreamRef::Label(name) = input {
                    if name == from {
                        *name = to.to_string();
                    }
                }
            }
            for output in &mut chain.outputs {
                if output == from {
                    *output = to.to_string();
                }
            }
        }
    }

    /// Check referential integrity without serializing.
    pub fn validate(&self) -> Result<(), GraphError> {
        if self.chains.is_empty() {
            return Err(GraphError::Empty);
        }

        let mut produced: Vec<&str> = Vec::new();
        let mut consumed: Vec<&str> = Vec::new();

        for chain in &self.chains {
            for input in &chain.inputs {
                if let StreamRef::Label(name) = input {
                    if !produced.iter().any(|p| p == name) {
                        return Err(GraphError::UndefinedLabel(name.clone()));
                    }
                    if consumed.iter().any(|c| c == name) {
                        return Err(GraphError::LabelReused(name.clone()));
                    }
                    consumed.push(name);
                }
            }
            for output in &chain.outputs {
                if produced.iter().any(|p| p == output) {
                    return Err(GraphError::DuplicateProducer(output.clone()));
                }
                produced.push(output);
            }
        }

        Ok(())
    }

    /// Validate, then serialize to the `-filter_complex` text form.
    pub fn render(&self) -> Result<String, GraphError> {
        self.validate()?;

        let statements: Vec<String> = self
            .chains
            .iter()
            .map(|chain| {
                let mut stmt = String::new();
                for input in &chain.inputs {
                    stmt.push_str(&input.to_string());
                }
                stmt.push_str(&chain.body);
                for output in &chain.outputs {
                    stmt.push('[');
                    stmt.push_str(output);
                    stmt.push(']');
                }
                stmt
            })
            .collect();

        Ok(statements.join(";"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_source_refs_and_labels() {
        let mut graph = FilterGraph::new();
        graph.add(
            vec![StreamRef::video(0)],
            "trim=start=0:end=5,setpts=PTS-STARTPTS",
            vec!["v0".into()],
        );
        graph.add(
            vec![StreamRef::label("v0")],
            "scale=1920:1080",
            vec!["outv".into()],
        );
        assert_eq!(
            graph.render().unwrap(),
            "[0:v]trim=start=0:end=5,setpts=PTS-STARTPTS[v0];[v0]scale=1920:1080[outv]"
        );
    }

    #[test]
    fn undefined_label_is_rejected() {
        let mut graph = FilterGraph::new();
        graph.add(vec![StreamRef::label("ghost")], "null", vec!["out".into()]);
        assert_eq!(
            graph.validate(),
            Err(GraphError::UndefinedLabel("ghost".into()))
        );
    }

    #[test]
    fn forward_reference_is_rejected() {
        let mut graph = FilterGraph::new();
        graph.add(vec![StreamRef::label("late")], "null", vec!["out".into()]);
        graph.add(vec![StreamRef::video(0)], "null", vec!["late".into()]);
        assert!(matches!(
            graph.validate(),
            Err(GraphError::UndefinedLabel(_))
        ));
    }

    #[test]
    fn duplicate_producer_is_rejected() {
        let mut graph = FilterGraph::new();
        graph.add(vec![StreamRef::video(0)], "null", vec!["x".into()]);
        graph.add(vec![StreamRef::video(1)], "null", vec!["x".into()]);
        assert_eq!(graph.validate(), Err(GraphError::DuplicateProducer("x".into())));
    }

    #[test]
    fn label_reuse_without_split_is_rejected() {
        let mut graph = FilterGraph::new();
        graph.add(vec![StreamRef::video(0)], "null", vec!["x".into()]);
        graph.add(vec![StreamRef::label("x")], "null", vec!["a".into()]);
        graph.add(vec![StreamRef::label("x")], "null", vec!["b".into()]);
        assert_eq!(graph.validate(), Err(GraphError::LabelReused("x".into())));
    }

    #[test]
    fn empty_graph_is_rejected() {
        assert_eq!(FilterGraph::new().render(), Err(GraphError::Empty));
    }

    #[test]
    fn terminal_labels_may_stay_unconsumed() {
        // They are consumed by -map, outside the graph.
        let mut graph = FilterGraph::new();
        graph.add(vec![StreamRef::video(0)], "null", vec!["outv".into()]);
        graph.add(vec![StreamRef::audio(0)], "anull", vec!["outa".into()]);
        assert!(graph.validate().is_ok());
    }
}
