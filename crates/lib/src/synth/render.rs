use std::collections::BTreeMap;

use indexmap::IndexMap;

use crate::assets::AssetRegistry;
use crate::construct::{NodeId, NodeKind, Tree};
use crate::consts::NESTED_STACK_RESOURCE_TYPE;
use crate::placeholder::Placeholder;
use crate::references::{StackResolver, StackState, WiringTable};
use crate::template::{ExportDef, OutputDef, Primitive, ResourceDef, Template};

use super::SynthError;

/// Everything rendering reads besides the tree.
pub(crate) struct RenderContext<'a> {
  pub tree: &'a Tree,
  pub states: &'a BTreeMap<NodeId, StackState>,
  pub table: &'a WiringTable,
  pub template_urls: &'a BTreeMap<NodeId, Placeholder>,
}

impl RenderContext<'_> {
  /// Render the template of `stack`. Asset parameters are declared when
  /// `assets` is given, which is only the case for top-level stacks.
  pub fn render(&self, stack: NodeId, assets: Option<&AssetRegistry>) -> Result<Template, SynthError> {
    let tree = self.tree;
    let resolver = StackResolver::new(tree, self.table, stack);
    let mut template = Template::default();

    for member in tree.members_of(stack) {
      let Some(node) = tree.get(member) else {
        continue;
      };
      match node.kind() {
        NodeKind::Parameter(def) => {
          insert_unique(&mut template.parameters, tree.logical_id(member)?, def.clone(), "parameter", tree, stack)?;
        }
        NodeKind::Resource(resource) => {
          let mut properties = IndexMap::with_capacity(resource.properties().len());
          for (name, value) in resource.properties() {
            properties.insert(name.clone(), value.resolve(&resolver)?);
          }
          let def = ResourceDef {
            resource_type: resource.resource_type().to_string(),
            properties,
          };
          insert_resource(&mut template, tree.logical_id(member)?, def, tree, stack)?;
        }
        NodeKind::Output(spec) => {
          let def = OutputDef {
            description: spec.description.clone(),
            value: spec.value.resolve(&resolver)?,
            export: spec.export_name.clone().map(|name| ExportDef { name }),
          };
          insert_unique(&mut template.outputs, tree.logical_id(member)?, def, "output", tree, stack)?;
        }
        NodeKind::Stack(_) if node.is_nested_stack() => {
          let def = self.nested_stack_resource(member, &resolver)?;
          insert_resource(&mut template, tree.nested_stack_resource_id(member)?, def, tree, stack)?;
        }
        _ => {}
      }
    }

    if let Some(state) = self.states.get(&stack) {
      for (name, def) in &state.parameters {
        insert_unique(&mut template.parameters, name.clone(), def.clone(), "parameter", tree, stack)?;
      }
      for (name, def) in &state.outputs {
        insert_unique(&mut template.outputs, name.clone(), def.clone(), "output", tree, stack)?;
      }
    }

    if let Some(assets) = assets {
      for (name, def) in assets.parameters_of(stack) {
        insert_unique(&mut template.parameters, name, def, "parameter", tree, stack)?;
      }
    }

    Ok(template)
  }

  /// The deployable-stack resource embedding `nested`: where its template
  /// lives, and the values its parameters receive.
  fn nested_stack_resource(&self, nested: NodeId, resolver: &StackResolver<'_>) -> Result<ResourceDef, SynthError> {
    let url = self.template_urls.get(&nested).ok_or_else(|| {
      SynthError::Inconsistent(format!(
        "nested stack '{}' has no template location",
        self.tree.path(nested)
      ))
    })?;

    let mut properties = IndexMap::new();
    properties.insert("TemplateURL".to_string(), url.resolve(resolver)?);

    if let Some(state) = self.states.get(&nested)
      && !state.resource_parameters.is_empty()
    {
      let parameters: IndexMap<String, Primitive> = state
        .resource_parameters
        .iter()
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect();
      properties.insert("Parameters".to_string(), Primitive::Object(parameters));
    }

    Ok(ResourceDef {
      resource_type: NESTED_STACK_RESOURCE_TYPE.to_string(),
      properties,
    })
  }
}

fn insert_unique<V>(
  section: &mut BTreeMap<String, V>,
  name: String,
  value: V,
  kind: &str,
  tree: &Tree,
  stack: NodeId,
) -> Result<(), SynthError> {
  if section.contains_key(&name) {
    return Err(SynthError::DuplicateLogicalId {
      stack: tree.path(stack),
      kind: kind.to_string(),
      id: name,
    });
  }
  section.insert(name, value);
  Ok(())
}

fn insert_resource(
  template: &mut Template,
  name: String,
  def: ResourceDef,
  tree: &Tree,
  stack: NodeId,
) -> Result<(), SynthError> {
  if template.resources.contains_key(&name) {
    return Err(SynthError::DuplicateLogicalId {
      stack: tree.path(stack),
      kind: "resource".to_string(),
      id: name,
    });
  }
  template.resources.insert(name, def);
  Ok(())
}
