use indexmap::IndexMap;
use stackweave_lib::App;
use stackweave_lib::construct::{CfnResource, NodeId, StackProps};
use stackweave_lib::placeholder::Placeholder;
use stackweave_lib::synth::CloudAssembly;
use stackweave_lib::template::{Primitive, Template};

/// An app with one top-level stack.
pub fn app_with_stack(id: &str) -> (App, NodeId) {
  let mut app = App::new();
  let root = app.root();
  let stack = app.add_stack(root, id, StackProps::default()).unwrap();
  (app, stack)
}

pub fn add_stack(app: &mut App, id: &str) -> NodeId {
  let root = app.root();
  app.add_stack(root, id, StackProps::default()).unwrap()
}

pub fn resource(app: &mut App, scope: NodeId, id: &str, resource_type: &str) -> NodeId {
  app.add_resource(scope, id, CfnResource::new(resource_type)).unwrap()
}

/// A resource whose `Value` property holds `value`.
pub fn consumer(app: &mut App, scope: NodeId, id: &str, value: Placeholder) -> NodeId {
  app
    .add_resource(scope, id, CfnResource::new("Custom::Consumer").with_property("Value", value))
    .unwrap()
}

pub fn top_template<'a>(assembly: &'a CloudAssembly, stack_name: &str) -> &'a Template {
  assembly
    .stack_template(stack_name)
    .unwrap_or_else(|| panic!("no template for stack {stack_name}"))
}

pub fn nested_template<'a>(app: &App, assembly: &'a CloudAssembly, nested: NodeId) -> &'a Template {
  let file = format!("{}.nested.template.json", app.tree().unique_id(nested));
  assembly
    .document(&file)
    .unwrap_or_else(|| panic!("no document {file}"))
}

/// The `Value` property of a consumer as rendered in `template`.
pub fn consumed<'a>(template: &'a Template, logical_id: &str) -> &'a Primitive {
  &template.resources[logical_id].properties["Value"]
}

/// The `Parameters` the deployable-stack resource of `nested` passes in.
pub fn passed_parameters<'a>(app: &App, parent: &'a Template, nested: NodeId) -> &'a IndexMap<String, Primitive> {
  let resource_id = app.tree().nested_stack_resource_id(nested).unwrap();
  match &parent.resources[&resource_id].properties["Parameters"] {
    Primitive::Object(parameters) => parameters,
    other => panic!("expected parameter object, got {other:?}"),
  }
}

/// Parameter names a stack declares, excluding asset parameters.
pub fn reference_parameters(template: &Template) -> Vec<&str> {
  template
    .parameters
    .keys()
    .map(String::as_str)
    .filter(|name| !name.starts_with("AssetParameters"))
    .collect()
}
