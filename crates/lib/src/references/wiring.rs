use std::collections::BTreeMap;

use tracing::{debug, trace};

use crate::construct::{NodeId, Tree, TreeError};
use crate::graph::StackGraph;
use crate::naming::{export_name, export_output_id, output_name, reference_parameter_name};
use crate::placeholder::{Leaf, ResolveError};
use crate::template::{ExportDef, OutputDef, ParameterDef, Primitive};

use super::catalog::Reference;
use super::classify::{Boundary, classify};

/// What wiring adds to a stack's template.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StackState {
  pub parameters: BTreeMap<String, ParameterDef>,
  pub outputs: BTreeMap<String, OutputDef>,
  /// Values the parent stack passes in for this nested stack's parameters.
  pub resource_parameters: BTreeMap<String, Primitive>,
}

/// How each wired leaf is written in each consuming stack.
pub type WiringTable = BTreeMap<(Leaf, NodeId), Primitive>;

/// The value at one step of a route, with the structural identity that
/// names whatever is synthesized at the next step.
#[derive(Debug, Clone)]
struct Hop {
  path: Vec<String>,
  attribute: String,
  value: Primitive,
}

/// Rewrites references into parameters, outputs, exports, and imports.
///
/// Every synthesized declaration is created by name if absent, so wiring
/// the same reference twice changes nothing.
#[derive(Debug, Default)]
pub struct Wiring {
  states: BTreeMap<NodeId, StackState>,
  table: WiringTable,
  graph: StackGraph,
}

impl Wiring {
  pub fn new(graph: StackGraph) -> Self {
    Self {
      states: BTreeMap::new(),
      table: WiringTable::new(),
      graph,
    }
  }

  pub fn state(&self, stack: NodeId) -> Option<&StackState> {
    self.states.get(&stack)
  }

  pub fn table(&self) -> &WiringTable {
    &self.table
  }

  pub fn graph(&self) -> &StackGraph {
    &self.graph
  }

  /// Wire one reference along its route and record how the consumer sees it.
  pub fn wire(&mut self, tree: &Tree, reference: &Reference) -> Result<Boundary, ResolveError> {
    let producer = &reference.producer;
    let route = classify(tree, producer.home, reference.consumer_stack)?;
    debug!(
      producer = %producer.path.join("/"),
      attribute = %producer.attribute,
      consumer = %tree.path(reference.consumer_node),
      boundary = %route.boundary,
      "wiring reference"
    );

    let mut hop = Hop {
      path: producer.path.clone(),
      attribute: producer.attribute.clone(),
      value: producer.native.clone(),
    };
    for &stack in &route.up {
      hop = self.publish_output(tree, stack, hop)?;
    }
    if let Some((producer_top, consumer_top)) = route.export {
      hop = self.export(tree, producer_top, consumer_top, hop)?;
    }
    for &stack in &route.down {
      hop = self.pass_parameter(tree, stack, hop);
    }

    self
      .table
      .insert((reference.leaf.clone(), reference.consumer_stack), hop.value);
    Ok(route.boundary)
  }

  /// Expose the value as an output of nested `stack`; its parent reads it
  /// through the deployable-stack resource.
  fn publish_output(&mut self, tree: &Tree, stack: NodeId, hop: Hop) -> Result<Hop, ResolveError> {
    let name = output_name(&hop.path, &hop.attribute);
    let resource_id = tree.nested_stack_resource_id(stack).map_err(|e| tree_fault(tree, stack, e))?;
    let resource_path = tree
      .nested_stack_resource_path(stack)
      .map_err(|e| tree_fault(tree, stack, e))?;

    let outputs = &mut self.states.entry(stack).or_default().outputs;
    if !outputs.contains_key(&name) {
      trace!(stack = %tree.path(stack), output = %name, "adding output");
      outputs.insert(
        name.clone(),
        OutputDef {
          description: None,
          value: hop.value,
          export: None,
        },
      );
    }

    Ok(Hop {
      path: resource_path,
      attribute: format!("Outputs.{name}"),
      value: Primitive::nested_output(resource_id, &name),
    })
  }

  /// Export the value from `producer_top` and import it into `consumer_top`.
  fn export(&mut self, tree: &Tree, producer_top: NodeId, consumer_top: NodeId, hop: Hop) -> Result<Hop, ResolveError> {
    let rendered = hop.value.to_json_string().map_err(|e| ResolveError::Render {
      value: format!("{:?}", hop.value),
      message: e.to_string(),
    })?;
    let output_id = export_output_id(&rendered);
    let name = export_name(&tree.stack_name(producer_top), &output_id);

    let outputs = &mut self.states.entry(producer_top).or_default().outputs;
    if !outputs.contains_key(&output_id) {
      trace!(stack = %tree.path(producer_top), output = %output_id, export = %name, "adding export");
      outputs.insert(
        output_id,
        OutputDef {
          description: None,
          value: hop.value,
          export: Some(ExportDef { name: name.clone() }),
        },
      );
    }

    if self.graph.add_dependency(consumer_top, producer_top) {
      debug!(
        stack = %tree.stack_name(consumer_top),
        depends_on = %tree.stack_name(producer_top),
        "added stack dependency"
      );
    }

    Ok(Hop {
      path: hop.path,
      attribute: hop.attribute,
      value: Primitive::ImportValue(name),
    })
  }

  /// Declare a parameter on nested `stack` and have its parent supply the value.
  fn pass_parameter(&mut self, tree: &Tree, stack: NodeId, hop: Hop) -> Hop {
    let name = reference_parameter_name(&hop.path, &hop.attribute);

    let state = self.states.entry(stack).or_default();
    if !state.parameters.contains_key(&name) {
      trace!(stack = %tree.path(stack), parameter = %name, "adding parameter");
      state.parameters.insert(name.clone(), ParameterDef::string());
      state.resource_parameters.insert(name.clone(), hop.value);
    }

    let mut path = tree.path_components(stack);
    path.push(name.clone());
    Hop {
      path,
      attribute: "Ref".to_string(),
      value: Primitive::reference(name),
    }
  }

  pub(crate) fn parts(&self) -> (&BTreeMap<NodeId, StackState>, &WiringTable, &StackGraph) {
    (&self.states, &self.table, &self.graph)
  }

  pub(crate) fn into_parts(self) -> (BTreeMap<NodeId, StackState>, WiringTable, StackGraph) {
    (self.states, self.table, self.graph)
  }
}

fn tree_fault(tree: &Tree, stack: NodeId, err: TreeError) -> ResolveError {
  debug!(stack = %tree.path(stack), error = %err, "route passes through a malformed stack");
  ResolveError::NoEnclosingStack { path: tree.path(stack) }
}
