//! Annotation classifier
//!
//! Maps a parsed class to its framework role using a fixed, priority-ordered
//! table of marker decorators. The first matching row wins, so a class that
//! carries markers for two roles is resolved by table order rather than by
//! the order the decorators were written in.

use crate::parsers::{ClassInfo, MethodInfo, Parameter};
use serde::{Deserialize, Serialize};

/// Framework role of a class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Module,
    Controller,
    Service,
    Guard,
    Pipe,
    Filter,
    Interceptor,
    Resolver,
    Gateway,
    Unknown,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Module => "module",
            Role::Controller => "controller",
            Role::Service => "service",
            Role::Guard => "guard",
            Role::Pipe => "pipe",
            Role::Filter => "filter",
            Role::Interceptor => "interceptor",
            Role::Resolver => "resolver",
            Role::Gateway => "gateway",
            Role::Unknown => "unknown",
        }
    }

    /// Roles the DI container instantiates as providers
    pub fn is_injectable(self) -> bool {
        matches!(
            self,
            Role::Service | Role::Guard | Role::Pipe | Role::Interceptor
        )
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

pub const MODULE_MARKER: &str = "Module";
pub const INJECTABLE_MARKER: &str = "Injectable";

/// One row of the role table: a required marker, an optional required
/// implemented interface, and the resulting role.
struct RoleRule {
    marker: &'static str,
    implements: Option<&'static str>,
    role: Role,
}

const ROLE_TABLE: &[RoleRule] = &[
    RoleRule { marker: "Module", implements: None, role: Role::Module },
    RoleRule { marker: "Controller", implements: None, role: Role::Controller },
    RoleRule { marker: "Resolver", implements: None, role: Role::Resolver },
    RoleRule { marker: "WebSocketGateway", implements: None, role: Role::Gateway },
    RoleRule { marker: "Catch", implements: None, role: Role::Filter },
    RoleRule { marker: "Injectable", implements: Some("CanActivate"), role: Role::Guard },
    RoleRule { marker: "Injectable", implements: Some("PipeTransform"), role: Role::Pipe },
    RoleRule { marker: "Injectable", implements: Some("NestInterceptor"), role: Role::Interceptor },
    RoleRule { marker: "Injectable", implements: None, role: Role::Service },
];

/// Route-verb markers that make a method an HTTP handler
pub const ROUTE_VERBS: &[&str] = &[
    "Get", "Post", "Put", "Patch", "Delete", "Options", "Head", "All",
];

/// Determine the framework role of a class
pub fn classify(class: &ClassInfo) -> Role {
    ROLE_TABLE
        .iter()
        .find(|row| {
            has_marker(class, row.marker)
                && row
                    .implements
                    .map_or(true, |iface| implements_interface(class, iface))
        })
        .map(|row| row.role)
        .unwrap_or(Role::Unknown)
}

/// Whether the class carries a decorator with this name
pub fn has_marker(class: &ClassInfo, name: &str) -> bool {
    class.decorators.iter().any(|d| d.name == name)
}

fn implements_interface(class: &ClassInfo, name: &str) -> bool {
    class.implements.iter().any(|i| i == name)
}

/// Any route-verb marker present on the method
pub fn is_http_handler(method: &MethodInfo) -> bool {
    method
        .decorators
        .iter()
        .any(|d| ROUTE_VERBS.contains(&d.name.as_str()))
}

/// Constructor parameter descriptor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamDescriptor {
    pub name: String,
    pub type_text: String,
    pub readonly: bool,
}

pub fn constructor_params(class: &ClassInfo) -> Vec<ParamDescriptor> {
    class.constructor_params.iter().map(describe).collect()
}

fn describe(param: &Parameter) -> ParamDescriptor {
    ParamDescriptor {
        name: param.name.clone(),
        type_text: param.type_text.clone().unwrap_or_default(),
        readonly: param.readonly,
    }
}
