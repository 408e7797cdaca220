//! Graph command - export the module graph

use crate::config::ModscopeConfig;
use crate::graph::{to_dot, to_json, ModuleGraph};
use crate::pipeline;
use anyhow::Result;
use console::style;
use std::path::Path;

pub fn run(path: &Path, config: Option<ModscopeConfig>, format: &str) -> Result<()> {
    let graph = pipeline::module_graph(path, config)?;

    if graph.is_empty() {
        eprintln!("{} No modules found under {}", style("!").yellow(), path.display());
    }

    println!("{}", render(&graph, format)?);
    Ok(())
}

fn render(graph: &ModuleGraph, format: &str) -> Result<String> {
    Ok(match format {
        "json" => to_json(graph)?,
        _ => to_dot(graph),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_render_both_formats() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("src");
        std::fs::create_dir_all(&src).unwrap();
        std::fs::write(
            src.join("app.module.ts"),
            "@Module({ imports: [UsersModule] })\nexport class AppModule {}\n",
        )
        .unwrap();
        std::fs::write(
            src.join("users.module.ts"),
            "@Module({})\nexport class UsersModule {}\n",
        )
        .unwrap();

        let graph = pipeline::module_graph(dir.path(), None).unwrap();
        let dot = render(&graph, "dot").unwrap();
        assert!(dot.starts_with("digraph"));
        assert!(dot.contains("AppModule") && dot.contains("UsersModule"));

        let json: serde_json::Value = serde_json::from_str(&render(&graph, "json").unwrap()).unwrap();
        assert_eq!(json["edges"]["AppModule"][0], "UsersModule");
        run(dir.path(), None, "json").unwrap();
    }
}
