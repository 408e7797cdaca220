//! TypeScript parser using tree-sitter
//!
//! Extracts top-level classes (with decorators, heritage, constructor
//! parameters and methods) and import statements. Only what the analysis
//! needs is kept; function bodies are never interpreted.

use super::{ClassInfo, Decorator, ImportInfo, MethodInfo, Parameter, SourceUnit, Visibility};
use anyhow::{Context, Result};
use std::path::Path;
use tree_sitter::{Language, Node, Parser};

/// Parse TypeScript source code directly
pub fn parse_source(source: &str, path: &Path) -> Result<SourceUnit> {
    let mut parser = Parser::new();
    let language: Language = tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into();

    parser
        .set_language(&language)
        .context("Failed to set TypeScript language")?;

    let tree = parser
        .parse(source, None)
        .context("Failed to parse source")?;

    let root = tree.root_node();
    let bytes = source.as_bytes();

    let mut unit = SourceUnit {
        path: path.to_path_buf(),
        source: source.to_string(),
        line_count: source.lines().count() as u32,
        ..Default::default()
    };

    let mut cursor = root.walk();
    for child in root.named_children(&mut cursor) {
        collect_top_level(&child, bytes, &mut unit);
    }

    Ok(unit)
}

fn collect_top_level(node: &Node, source: &[u8], unit: &mut SourceUnit) {
    match node.kind() {
        "import_statement" => {
            if let Some(import) = parse_import(node, source) {
                unit.imports.push(import);
            }
        }
        "class_declaration" | "abstract_class_declaration" => {
            if let Some(class) = parse_class(node, source, Vec::new()) {
                unit.classes.push(class);
            }
        }
        "export_statement" => {
            // Decorators written before `export` belong to the export statement
            let outer = extract_ts_decorators(node, source);
            let mut cursor = node.walk();
            for child in node.named_children(&mut cursor) {
                if matches!(
                    child.kind(),
                    "class_declaration" | "abstract_class_declaration" | "class"
                ) {
                    if let Some(class) = parse_class(&child, source, outer.clone()) {
                        unit.classes.push(class);
                    }
                }
            }
        }
        _ => {}
    }
}

fn node_text<'a>(node: &Node, source: &'a [u8]) -> &'a str {
    node.utf8_text(source).unwrap_or("")
}

/// `Foo.Bar<Baz>` -> `Bar`
fn last_segment(text: &str) -> String {
    let head = text.split('<').next().unwrap_or(text);
    head.rsplit('.').next().unwrap_or(head).trim().to_string()
}

/// Parse a class declaration; `outer` holds decorators attached to an
/// enclosing export statement.
fn parse_class(node: &Node, source: &[u8], outer: Vec<Decorator>) -> Option<ClassInfo> {
    let name_node = node.child_by_field_name("name")?;
    let name = node_text(&name_node, source).to_string();
    if name.is_empty() {
        return None;
    }

    let mut decorators = outer;
    decorators.extend(extract_ts_decorators(node, source));

    let (extends, implements) = extract_class_heritage(node, source);

    let mut constructor_params = Vec::new();
    let mut methods = Vec::new();

    if let Some(body) = node.child_by_field_name("body") {
        // Only direct members; nested closures are not methods
        let mut cursor = body.walk();
        for member in body.named_children(&mut cursor) {
            if member.kind() != "method_definition" {
                continue;
            }
            let Some(member_name) = member.child_by_field_name("name") else {
                continue;
            };
            if node_text(&member_name, source) == "constructor" {
                constructor_params = extract_parameters(&member, source);
            } else if let Some(method) = parse_method_node(&member, &member_name, source) {
                methods.push(method);
            }
        }
    }

    Some(ClassInfo {
        name,
        line: name_node.start_position().row as u32 + 1,
        column: name_node.start_position().column as u32 + 1,
        line_end: node.end_position().row as u32 + 1,
        decorators,
        extends,
        implements,
        constructor_params,
        methods,
    })
}

/// Extract decorators from direct children of a node.
///
/// Class-level decorators are children of `class_declaration` (or of the
/// surrounding `export_statement`). The decorator AST is `decorator` ->
/// `@` + expression (identifier, member expression or call expression).
fn extract_ts_decorators(node: &Node, source: &[u8]) -> Vec<Decorator> {
    let mut decorators = Vec::new();
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if child.kind() == "decorator" {
            if let Some(decorator) = parse_decorator(&child, source) {
                decorators.push(decorator);
            }
        }
    }
    decorators
}

/// Method decorators are preceding siblings in the class body, not children
/// of the `method_definition`. Walk backwards collecting them.
fn extract_preceding_decorators(node: &Node, source: &[u8]) -> Vec<Decorator> {
    let mut decorators = Vec::new();
    let mut sibling = node.prev_sibling();
    while let Some(sib) = sibling {
        match sib.kind() {
            "decorator" => {
                if let Some(decorator) = parse_decorator(&sib, source) {
                    decorators.push(decorator);
                }
            }
            "comment" => {}
            _ => break,
        }
        sibling = sib.prev_sibling();
    }
    decorators.reverse();
    decorators
}

/// `@Controller('users')` -> `Controller` with argument `'users'`
fn parse_decorator(decorator_node: &Node, source: &[u8]) -> Option<Decorator> {
    let mut cursor = decorator_node.walk();
    for inner in decorator_node.named_children(&mut cursor) {
        match inner.kind() {
            "comment" => continue,
            "call_expression" => {
                let function = inner.child_by_field_name("function")?;
                let argument = inner
                    .child_by_field_name("arguments")
                    .and_then(|args| first_argument(&args, source));
                return Some(Decorator {
                    name: last_segment(node_text(&function, source)),
                    argument,
                });
            }
            "identifier" | "member_expression" => {
                return Some(Decorator {
                    name: last_segment(node_text(&inner, source)),
                    argument: None,
                });
            }
            _ => {
                let text = node_text(&inner, source);
                let name = text.split('(').next().unwrap_or(text).trim();
                if !name.is_empty() {
                    return Some(Decorator {
                        name: last_segment(name),
                        argument: None,
                    });
                }
            }
        }
    }
    None
}

fn first_argument(args: &Node, source: &[u8]) -> Option<String> {
    let mut cursor = args.walk();
    let first = args
        .named_children(&mut cursor)
        .find(|c| c.kind() != "comment")?;
    Some(node_text(&first, source).to_string())
}

/// Extract `extends` and `implements` from a class
fn extract_class_heritage(class_node: &Node, source: &[u8]) -> (Option<String>, Vec<String>) {
    let mut extends = None;
    let mut implements = Vec::new();

    let mut cursor = class_node.walk();
    for child in class_node.children(&mut cursor) {
        if child.kind() != "class_heritage" {
            continue;
        }
        let mut heritage_cursor = child.walk();
        for clause in child.named_children(&mut heritage_cursor) {
            match clause.kind() {
                "extends_clause" => {
                    if let Some(value) = clause
                        .child_by_field_name("value")
                        .or_else(|| clause.named_child(0))
                    {
                        extends = Some(last_segment(node_text(&value, source)));
                    }
                }
                "implements_clause" => {
                    let mut type_cursor = clause.walk();
                    for ty in clause.named_children(&mut type_cursor) {
                        let name = last_segment(node_text(&ty, source));
                        if !name.is_empty() {
                            implements.push(name);
                        }
                    }
                }
                _ => {}
            }
        }
    }

    (extends, implements)
}

/// Parse a method definition. Accessors (`get x()`/`set x()`) are skipped.
fn parse_method_node(node: &Node, name_node: &Node, source: &[u8]) -> Option<MethodInfo> {
    let name = node_text(name_node, source).to_string();

    let mut visibility = if name_node.kind() == "private_property_identifier" {
        Some(Visibility::Private)
    } else {
        None
    };
    let mut is_static = false;
    let mut is_async = false;

    // Modifier tokens precede the name
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if child.id() == name_node.id() {
            break;
        }
        match child.kind() {
            "accessibility_modifier" => {
                visibility = Visibility::parse(node_text(&child, source)).or(visibility);
            }
            "static" => is_static = true,
            "async" => is_async = true,
            "get" | "set" => return None,
            _ => {}
        }
    }

    Some(MethodInfo {
        name,
        visibility,
        is_static,
        is_async,
        decorators: extract_preceding_decorators(node, source),
        line: name_node.start_position().row as u32 + 1,
        column: name_node.start_position().column as u32 + 1,
        line_end: node.end_position().row as u32 + 1,
    })
}

/// Extract parameter descriptors from a method's `formal_parameters`
fn extract_parameters(method: &Node, source: &[u8]) -> Vec<Parameter> {
    let Some(params) = method.child_by_field_name("parameters") else {
        return vec![];
    };

    let mut result = Vec::new();
    let mut cursor = params.walk();
    for param in params.named_children(&mut cursor) {
        if !matches!(param.kind(), "required_parameter" | "optional_parameter") {
            continue;
        }
        let Some(pattern) = param.child_by_field_name("pattern") else {
            continue;
        };
        if pattern.kind() == "this" {
            continue;
        }

        let type_text = param.child_by_field_name("type").map(|t| {
            node_text(&t, source)
                .trim_start_matches(':')
                .trim()
                .to_string()
        });

        let mut modifiers = Vec::new();
        let mut decorators = Vec::new();
        let mut readonly = false;
        let mut param_cursor = param.walk();
        for child in param.children(&mut param_cursor) {
            match child.kind() {
                "accessibility_modifier" | "override_modifier" => {
                    modifiers.push(node_text(&child, source).to_string());
                }
                "readonly" => {
                    readonly = true;
                    modifiers.push("readonly".to_string());
                }
                "decorator" => {
                    if let Some(decorator) = parse_decorator(&child, source) {
                        decorators.push(decorator);
                    }
                }
                _ => {}
            }
        }

        result.push(Parameter {
            name: node_text(&pattern, source).to_string(),
            type_text: type_text.filter(|t| !t.is_empty()),
            modifiers,
            readonly,
            decorators,
        });
    }

    result
}

/// Extract an import statement
fn parse_import(node: &Node, source: &[u8]) -> Option<ImportInfo> {
    let source_node = node.child_by_field_name("source")?;
    let specifier = node_text(&source_node, source)
        .trim_matches(|c| c == '\'' || c == '"' || c == '`')
        .to_string();

    let mut names = Vec::new();
    let mut is_type_only = false;

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        match child.kind() {
            "type" => is_type_only = true,
            "import_clause" => collect_import_names(&child, source, &mut names),
            _ => {}
        }
    }

    Some(ImportInfo {
        specifier,
        names,
        is_type_only,
        line: node.start_position().row as u32 + 1,
    })
}

fn collect_import_names(clause: &Node, source: &[u8], names: &mut Vec<String>) {
    let mut cursor = clause.walk();
    for child in clause.named_children(&mut cursor) {
        match child.kind() {
            "identifier" => names.push(node_text(&child, source).to_string()),
            "named_imports" => {
                let mut spec_cursor = child.walk();
                for spec in child.named_children(&mut spec_cursor) {
                    if spec.kind() != "import_specifier" {
                        continue;
                    }
                    let bound = spec
                        .child_by_field_name("alias")
                        .or_else(|| spec.child_by_field_name("name"));
                    if let Some(bound) = bound {
                        names.push(node_text(&bound, source).to_string());
                    }
                }
            }
            "namespace_import" => {
                let mut ns_cursor = child.walk();
                let ident = child
                    .named_children(&mut ns_cursor)
                    .find(|c| c.kind() == "identifier");
                if let Some(ident) = ident {
                    names.push(node_text(&ident, source).to_string());
                }
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const USERS: &str = r#"import { Injectable, Controller, Get, Module } from '@nestjs/common';
import { Repository } from 'typeorm';
import type { Config } from './config';
import * as fs from 'fs';

@Injectable()
export class UsersService {
  constructor(
    private readonly repo: Repository<User>,
    @Inject('CONFIG') config: Config,
  ) {}

  findAll() {
    return this.repo.find();
  }

  public async findOne(id: string) {
    return this.repo.findOne(id);
  }

  private normalize(x: string) {
    return x;
  }

  get count() {
    return 1;
  }
}

@Controller('users')
export class UsersController {
  constructor(private usersService: UsersService) {}

  @Get()
  list() {
    return this.usersService.findAll();
  }
}

@Module({ providers: [UsersService], controllers: [UsersController] })
export class UsersModule {}
"#;

    fn parse() -> SourceUnit {
        parse_source(USERS, Path::new("src/users.ts")).unwrap()
    }

    #[test]
    fn test_extracts_classes_with_decorators() {
        let unit = parse();
        let names: Vec<_> = unit.classes.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["UsersService", "UsersController", "UsersModule"]);

        let service = unit.class("UsersService").unwrap();
        assert_eq!(service.decorators[0].name, "Injectable");
        assert_eq!(service.line, 7);

        let controller = unit.class("UsersController").unwrap();
        assert_eq!(controller.decorators[0].name, "Controller");
        assert_eq!(controller.decorators[0].argument.as_deref(), Some("'users'"));

        let module = unit.class("UsersModule").unwrap();
        let arg = module.decorators[0].argument.as_deref().unwrap();
        assert!(arg.starts_with('{'));
        assert!(arg.contains("providers: [UsersService]"));
    }

    #[test]
    fn test_constructor_parameters() {
        let unit = parse();
        let service = unit.class("UsersService").unwrap();
        assert_eq!(service.constructor_params.len(), 2);

        let repo = &service.constructor_params[0];
        assert_eq!(repo.name, "repo");
        assert_eq!(repo.type_text.as_deref(), Some("Repository<User>"));
        assert!(repo.readonly);
        assert!(repo.modifiers.contains(&"private".to_string()));

        let config = &service.constructor_params[1];
        assert!(!config.readonly);
        assert_eq!(config.decorators[0].name, "Inject");
    }

    #[test]
    fn test_methods_and_visibility() {
        let unit = parse();
        let service = unit.class("UsersService").unwrap();
        let names: Vec<_> = service.methods.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["findAll", "findOne", "normalize"]);
        assert_eq!(service.methods[0].visibility, None);
        assert_eq!(service.methods[1].visibility, Some(Visibility::Public));
        assert!(service.methods[1].is_async);
        assert_eq!(service.methods[2].visibility, Some(Visibility::Private));

        let controller = unit.class("UsersController").unwrap();
        assert_eq!(controller.methods[0].decorators[0].name, "Get");
    }

    #[test]
    fn test_imports() {
        let unit = parse();
        assert_eq!(unit.imports.len(), 4);
        assert_eq!(unit.imports[0].specifier, "@nestjs/common");
        assert!(unit.imports[0].names.contains(&"Injectable".to_string()));
        assert!(unit.imports[2].is_type_only);
        assert_eq!(unit.imports[3].names, vec!["fs".to_string()]);
    }

    #[test]
    fn test_heritage() {
        let src = "@Injectable()\nexport class AuthGuard extends Base implements CanActivate, OnModuleInit {}\n";
        let unit = parse_source(src, Path::new("auth.guard.ts")).unwrap();
        let class = &unit.classes[0];
        assert_eq!(class.extends.as_deref(), Some("Base"));
        assert_eq!(class.implements, vec!["CanActivate", "OnModuleInit"]);
    }

    #[test]
    fn test_empty_source() {
        let unit = parse_source("", Path::new("empty.ts")).unwrap();
        assert!(unit.classes.is_empty());
        assert!(unit.imports.is_empty());
        assert_eq!(unit.line_count, 0);
    }
}
