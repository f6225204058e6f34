use stackweave_lib::App;
use stackweave_lib::assets::AssetSource;
use stackweave_lib::construct::{CfnResource, Environment, OutputSpec, StackProps};
use stackweave_lib::graph::GraphError;
use stackweave_lib::naming::reference_parameter_name;
use stackweave_lib::synth::{SynthError, SynthOptions};
use stackweave_lib::template::{ParameterDef, Primitive};
use tempfile::tempdir;

use super::common::{
  add_stack, app_with_stack, consumed, consumer, nested_template, passed_parameters, resource, top_template,
};

/// Two top-level stacks, a double-nested chain, and references in every direction.
fn sample_app() -> App {
  let mut app = App::new();
  let producer = add_stack(&mut app, "Producer");
  let parent = add_stack(&mut app, "Parent");
  let n1 = app.add_nested_stack(parent, "N1").unwrap();
  let n2 = app.add_nested_stack(n1, "N2").unwrap();

  let table = app
    .add_resource(producer, "Table", CfnResource::new("AWS::DynamoDB::Table").with_attributes(["Arn"]))
    .unwrap();
  let bucket = resource(&mut app, parent, "Bucket", "AWS::S3::Bucket");
  let topic = resource(&mut app, n2, "Topic", "AWS::SNS::Topic");
  app.add_file_asset(n1, "Code", inline("code.zip", "handler")).unwrap();

  let arn = app.get_att(table, "Arn").unwrap();
  let bucket_ref = app.reference(bucket).unwrap();
  let topic_ref = app.reference(topic).unwrap();
  consumer(&mut app, n2, "TableReader", arn);
  consumer(&mut app, n2, "BucketReader", bucket_ref);
  consumer(&mut app, parent, "TopicReader", topic_ref);
  app
}

fn inline(name: &str, contents: &str) -> AssetSource {
  AssetSource::Inline {
    name: name.to_string(),
    contents: contents.as_bytes().to_vec(),
  }
}

// =============================================================================
// Determinism
// =============================================================================

#[test]
fn synthesis_is_byte_identical_across_runs() {
  let first = sample_app().synth().unwrap();
  let second = sample_app().synth().unwrap();
  assert_eq!(first.render(true).unwrap(), second.render(true).unwrap());
  assert_eq!(
    serde_json::to_string(&first.manifest).unwrap(),
    serde_json::to_string(&second.manifest).unwrap()
  );
  assert_eq!(first.manifest.artifacts["Parent"].dependencies, vec!["Producer".to_string()]);
}

#[test]
fn assembly_written_to_disk_matches_the_rendered_documents() {
  let temp = tempdir().unwrap();
  let options = SynthOptions {
    output_dir: temp.path().join("out"),
    ..Default::default()
  };
  let assembly = sample_app().synth().unwrap();
  let written = assembly.write_to(&options).unwrap();

  let rendered = assembly.render(true).unwrap();
  assert_eq!(written.len(), rendered.len() + 1);
  assert!(options.output_dir.join("manifest.json").is_file());
  for (file, contents) in rendered {
    let on_disk = std::fs::read_to_string(options.output_dir.join(&file)).unwrap();
    assert_eq!(on_disk, contents, "{file}");
  }
}

// =============================================================================
// Nested stacks
// =============================================================================

#[test]
fn double_nesting_registers_every_template_on_the_top_level_stack() {
  let (mut app, parent) = app_with_stack("Parent");
  let n1 = app.add_nested_stack(parent, "N1").unwrap();
  let n2 = app.add_nested_stack(n1, "N2").unwrap();
  resource(&mut app, n2, "Queue", "AWS::SQS::Queue");

  let assembly = app.synth().unwrap();
  let artifact = &assembly.manifest.artifacts["Parent"];
  assert_eq!(artifact.assets.len(), 2);

  let top = top_template(&assembly, "Parent");
  assert_eq!(top.parameters.len(), 6);

  // N1 forwards the bucket and key of N2's template to the resource it holds
  let t1 = nested_template(&app, &assembly, n1);
  assert_eq!(t1.parameters.len(), 2);
  assert_eq!(passed_parameters(&app, top, n1).len(), 2);

  let n2_resource = app.tree().nested_stack_resource_id(n2).unwrap();
  let url = t1.resources[&n2_resource].properties["TemplateURL"].to_json_string().unwrap();
  for name in t1.parameters.keys() {
    assert!(url.contains(name.as_str()), "{name} not in {url}");
  }
  assert!(url.contains("AWS::URLSuffix"));
}

#[test]
fn nested_stacks_inherit_the_top_level_environment() {
  let mut app = App::new();
  let root = app.root();
  let parent = app
    .add_stack(
      root,
      "Parent",
      StackProps {
        env: Environment::new("111111111111", "us-east-1"),
        ..Default::default()
      },
    )
    .unwrap();
  let n1 = app.add_nested_stack(parent, "N1").unwrap();
  let n2 = app.add_nested_stack(n1, "N2").unwrap();

  assert_eq!(app.environment(n2).unwrap(), Environment::new("111111111111", "us-east-1"));

  let assembly = app.synth().unwrap();
  assert_eq!(assembly.manifest.artifacts["Parent"].environment, "aws://111111111111/us-east-1");
}

#[test]
fn user_parameters_and_outputs_are_rendered() {
  let (mut app, stack) = app_with_stack("Stack");
  let env = app
    .add_parameter(stack, "EnvName", ParameterDef::string().with_description("deployment stage"))
    .unwrap();
  let value = app.reference(env).unwrap();
  app
    .add_output(
      stack,
      "Stage",
      OutputSpec {
        export_name: Some("stage".to_string()),
        ..OutputSpec::new(value)
      },
    )
    .unwrap();

  let assembly = app.synth().unwrap();
  let template = top_template(&assembly, "Stack");
  assert_eq!(template.parameters["EnvName"].description.as_deref(), Some("deployment stage"));
  assert_eq!(template.outputs["Stage"].value, Primitive::reference("EnvName"));
  assert_eq!(template.export_names(), vec!["stage"]);
}

// =============================================================================
// Stack identity
// =============================================================================

#[test]
fn a_stack_reads_its_own_identity_as_pseudo_parameters() {
  let (mut app, parent) = app_with_stack("Parent");
  let nested = app.add_nested_stack(parent, "Nested").unwrap();
  let own = app.stack_name(parent).unwrap();
  consumer(&mut app, parent, "Named", own);
  let own_nested = app.stack_id(nested).unwrap();
  consumer(&mut app, nested, "Identified", own_nested);

  let assembly = app.synth().unwrap();
  assert_eq!(
    *consumed(top_template(&assembly, "Parent"), "Named"),
    Primitive::reference("AWS::StackName")
  );
  let inner = nested_template(&app, &assembly, nested);
  assert_eq!(*consumed(inner, "Identified"), Primitive::reference("AWS::StackId"));
  assert!(inner.parameters.is_empty());
}

#[test]
fn parent_reads_nested_identity_from_the_stack_resource() {
  let (mut app, parent) = app_with_stack("Parent");
  let nested = app.add_nested_stack(parent, "Nested").unwrap();
  let id = app.stack_id(nested).unwrap();
  let name = app.stack_name(nested).unwrap();
  consumer(&mut app, parent, "Id", id);
  consumer(&mut app, parent, "Name", name);

  let assembly = app.synth().unwrap();
  let top = top_template(&assembly, "Parent");
  let resource_id = app.tree().nested_stack_resource_id(nested).unwrap();
  assert_eq!(*consumed(top, "Id"), Primitive::reference(resource_id.clone()));
  assert_eq!(
    *consumed(top, "Name"),
    Primitive::Select {
      index: 1,
      list: Box::new(Primitive::Split {
        separator: "/".to_string(),
        source: Box::new(Primitive::reference(resource_id)),
      }),
    }
  );
}

#[test]
fn nested_stack_receives_the_parent_name_as_a_parameter() {
  let (mut app, parent) = app_with_stack("Parent");
  let nested = app.add_nested_stack(parent, "Nested").unwrap();
  let name = app.stack_name(parent).unwrap();
  consumer(&mut app, nested, "ParentName", name);

  let assembly = app.synth().unwrap();
  let param = reference_parameter_name(&["Parent"], "StackName");
  let top = top_template(&assembly, "Parent");
  assert_eq!(passed_parameters(&app, top, nested)[&param], Primitive::reference("AWS::StackName"));
  let inner = nested_template(&app, &assembly, nested);
  assert_eq!(*consumed(inner, "ParentName"), Primitive::reference(param));
}

// =============================================================================
// Failures
// =============================================================================

#[test]
fn mutual_references_between_top_level_stacks_are_a_cycle() {
  let mut app = App::new();
  let s1 = add_stack(&mut app, "S1");
  let s2 = add_stack(&mut app, "S2");
  let a = resource(&mut app, s1, "A", "AWS::SQS::Queue");
  let b = resource(&mut app, s2, "B", "AWS::SQS::Queue");
  let a_ref = app.reference(a).unwrap();
  let b_ref = app.reference(b).unwrap();
  consumer(&mut app, s2, "ReadsA", a_ref);
  consumer(&mut app, s1, "ReadsB", b_ref);

  let err = app.synth().unwrap_err();
  assert!(matches!(err, SynthError::Graph(GraphError::Cycle { .. })), "{err}");
  assert!(err.to_string().contains("cycle"));
}

#[test]
fn pinned_environments_must_match_across_stacks() {
  let mut app = App::new();
  let root = app.root();
  let east = app
    .add_stack(
      root,
      "East",
      StackProps {
        env: Environment::new("111111111111", "us-east-1"),
        ..Default::default()
      },
    )
    .unwrap();
  let west = app
    .add_stack(
      root,
      "West",
      StackProps {
        env: Environment::new("111111111111", "us-west-2"),
        ..Default::default()
      },
    )
    .unwrap();
  let bucket = resource(&mut app, east, "Bucket", "AWS::S3::Bucket");
  let value = app.reference(bucket).unwrap();
  consumer(&mut app, west, "Reader", value);

  let err = app.synth().unwrap_err();
  assert!(matches!(err, SynthError::CrossEnvironment { .. }), "{err}");
}
