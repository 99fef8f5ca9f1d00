use std::path::{Path, PathBuf};
use tracing::info;

use crate::error::{OrchestrationError, Result};
use crate::flow::flow::{Flow, MethodKind};
use crate::flow::trigger::Trigger;

impl<S> Flow<S>
where
    S: Default + Clone + Send + Sync + 'static,
{
    /// Mermaid flowchart of the method graph
    pub fn to_mermaid(&self) -> String {
        let mut out = String::from("flowchart TD\n");
        let methods = self.methods();
        let routers: Vec<&str> = methods
            .iter()
            .filter(|m| m.is_router())
            .map(|m| m.name.as_str())
            .collect();

        for method in methods {
            let node = match method.kind {
                MethodKind::Start => format!("{0}([{0}])", method.name),
                MethodKind::Listen(_) => format!("{0}[{0}]", method.name),
                MethodKind::Router(_) => format!("{0}{{{0}}}", method.name),
            };
            out.push_str(&format!("    {}\n", node));
        }

        for method in methods {
            let Some(trigger) = method.trigger() else {
                continue;
            };
            let label = match trigger {
                Trigger::Method(_) => None,
                Trigger::And(_) => Some("AND"),
                Trigger::Or(_) => Some("OR"),
            };
            for source in trigger.names() {
                if methods.iter().any(|m| m.name == source) {
                    let edge = match label {
                        Some(label) => format!("    {} -->|{}| {}\n", source, label, method.name),
                        None => format!("    {} --> {}\n", source, method.name),
                    };
                    out.push_str(&edge);
                } else {
                    // a route label emitted by one of the routers
                    for router in &routers {
                        out.push_str(&format!("    {} -.->|{}| {}\n", router, source, method.name));
                    }
                }
            }
        }
        out
    }

    /// Write the diagram as a markdown file named after the flow
    pub fn plot(&self, dir: impl AsRef<Path>) -> Result<PathBuf> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir).map_err(OrchestrationError::from)?;
        let path = dir.join(format!("{}.md", self.name()));

        let mut doc = format!("# {}\n\n", self.name());
        if !self.description().is_empty() {
            doc.push_str(self.description());
            doc.push_str("\n\n");
        }
        doc.push_str("```mermaid\n");
        doc.push_str(&self.to_mermaid());
        doc.push_str("```\n");

        std::fs::write(&path, doc).map_err(|e| {
            OrchestrationError::RuntimeError(format!("Failed to write {}: {}", path.display(), e))
        })?;
        info!("Flow diagram written to {}", path.display());
        Ok(path)
    }
}
