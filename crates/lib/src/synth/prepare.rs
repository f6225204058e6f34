use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, info};

use crate::app::App;
use crate::assets::{AssetRegistry, AssetSource, FileAsset, Packaging};
use crate::construct::{NodeId, Tree};
use crate::consts::NESTED_TEMPLATE_SUFFIX;
use crate::graph::StackGraph;
use crate::placeholder::{Leaf, Placeholder};
use crate::references::{Boundary, Reference, StackState, Wiring, WiringTable, discover};
use crate::template::Template;

use super::SynthError;
use super::render::RenderContext;

/// A nested stack's rendered template and the document it is written to.
#[derive(Debug, Clone, PartialEq)]
pub struct NestedTemplate {
  pub file: String,
  pub template: Template,
}

/// The result of the prepare phase: everything synthesis needs beyond the tree.
#[derive(Debug)]
pub struct Prepared {
  states: BTreeMap<NodeId, StackState>,
  table: WiringTable,
  graph: StackGraph,
  assets: AssetRegistry,
  template_urls: BTreeMap<NodeId, Placeholder>,
  nested_templates: BTreeMap<NodeId, NestedTemplate>,
  wired: Vec<(Reference, Boundary)>,
}

impl Prepared {
  pub fn graph(&self) -> &StackGraph {
    &self.graph
  }

  /// Assets per top-level stack, including nested stack templates.
  pub fn assets(&self) -> &AssetRegistry {
    &self.assets
  }

  pub fn state(&self, stack: NodeId) -> Option<&StackState> {
    self.states.get(&stack)
  }

  pub fn nested_template(&self, stack: NodeId) -> Option<&NestedTemplate> {
    self.nested_templates.get(&stack)
  }

  pub fn nested_templates(&self) -> impl Iterator<Item = &NestedTemplate> {
    self.nested_templates.values()
  }

  /// Every wired reference with its classification, in wiring order.
  pub fn references(&self) -> &[(Reference, Boundary)] {
    &self.wired
  }

  pub(crate) fn render_context<'a>(&'a self, tree: &'a Tree) -> RenderContext<'a> {
    RenderContext {
      tree,
      states: &self.states,
      table: &self.table,
      template_urls: &self.template_urls,
    }
  }
}

/// Run the prepare phase over a fully built application.
///
/// 1. Discover every reference from an immutable snapshot of the tree, then
///    classify and wire each one.
/// 2. Render nested stacks deepest first, register each template as a file
///    asset of its top-level stack, and wire the asset parameters down to
///    the stack holding the deployable-stack resource.
/// 3. Reject cross-top-level references between conflicting environments.
/// 4. Reject dependency cycles.
pub fn prepare(app: &App) -> Result<Prepared, SynthError> {
  let tree = app.tree();

  let mut graph = StackGraph::new();
  for stack in tree.top_level_stacks() {
    graph.add_stack(stack, tree.stack_name(stack));
  }
  let mut wiring = Wiring::new(graph);

  let references = discover(tree)?;
  let mut wired = Vec::with_capacity(references.len());
  for reference in references {
    let boundary = wiring.wire(tree, &reference)?;
    wired.push((reference, boundary));
  }

  let mut assets = app.assets().clone();
  let mut template_urls = BTreeMap::new();
  let mut nested_templates = BTreeMap::new();

  // Stable sort: ties stay in pre-order
  let mut nested: Vec<NodeId> = tree.stacks().into_iter().filter(|s| tree.is_nested(*s)).collect();
  nested.sort_by_key(|s| Reverse(tree.stack_chain(*s).len()));

  for stack in nested {
    let (states, table, _) = wiring.parts();
    let template = RenderContext {
      tree,
      states,
      table,
      template_urls: &template_urls,
    }
    .render(stack, None)?;

    let file = format!("{}{}", tree.unique_id(stack), NESTED_TEMPLATE_SUFFIX);
    let contents = template.to_json(false).map_err(|source| SynthError::Serialize {
      what: file.clone(),
      source,
    })?;
    let hash = app.bundler().content_hash(&AssetSource::Inline {
      name: file.clone(),
      contents: contents.into_bytes(),
    })?;

    let (Some(top), Some(parent)) = (tree.top_level_of(stack), tree.parent_stack(stack)) else {
      return Err(SynthError::Inconsistent(format!(
        "nested stack '{}' has no enclosing stack",
        tree.path(stack)
      )));
    };
    assets.register(top, hash.clone(), Packaging::File, file.clone());
    debug!(stack = %tree.path(stack), file = %file, %hash, "embedded nested stack template");

    let url = FileAsset {
      node: stack,
      stack: top,
      hash,
    }
    .http_url();

    let mut seen: BTreeSet<Leaf> = BTreeSet::new();
    for leaf in url.leaves() {
      if !seen.insert(leaf.clone()) {
        continue;
      }
      if let Some(reference) = Reference::between(tree, &leaf, stack, parent)? {
        let boundary = wiring.wire(tree, &reference)?;
        wired.push((reference, boundary));
      }
    }

    template_urls.insert(stack, url);
    nested_templates.insert(stack, NestedTemplate { file, template });
  }

  let (states, table, graph) = wiring.into_parts();

  for (dependent, dependency) in graph.edges() {
    let consumer_env = tree.environment(dependent)?;
    let producer_env = tree.environment(dependency)?;
    if consumer_env.conflicts_with(&producer_env) {
      return Err(SynthError::CrossEnvironment {
        consumer: graph.name(dependent),
        consumer_env: consumer_env.to_string(),
        producer: graph.name(dependency),
        producer_env: producer_env.to_string(),
      });
    }
  }

  graph.verify_acyclic()?;

  info!(
    references = wired.len(),
    nested_stacks = nested_templates.len(),
    dependencies = graph.edge_count(),
    "prepared application"
  );

  Ok(Prepared {
    states,
    table,
    graph,
    assets,
    template_urls,
    nested_templates,
    wired,
  })
}
