use stackweave_lib::construct::CfnResource;
use stackweave_lib::naming::{export_name, export_output_id, output_name, reference_parameter_name};
use stackweave_lib::references::Boundary;
use stackweave_lib::template::Primitive;

use super::common::{
  add_stack, app_with_stack, consumed, consumer, nested_template, passed_parameters, reference_parameters, resource,
  top_template,
};

// =============================================================================
// Same stack
// =============================================================================

#[test]
fn same_stack_reference_is_native() {
  let (mut app, parent) = app_with_stack("Parent");
  let bucket = resource(&mut app, parent, "Bucket", "AWS::S3::Bucket");
  let value = app.reference(bucket).unwrap();
  consumer(&mut app, parent, "User", value);

  let assembly = app.synth().unwrap();
  let template = top_template(&assembly, "Parent");
  assert!(template.parameters.is_empty());
  assert!(template.outputs.is_empty());
  assert_eq!(*consumed(template, "User"), Primitive::reference("Bucket"));
}

#[test]
fn references_within_a_nested_stack_stay_local() {
  let (mut app, parent) = app_with_stack("Parent");
  let nested = app.add_nested_stack(parent, "Nested").unwrap();
  let queue = app
    .add_resource(nested, "Queue", CfnResource::new("AWS::SQS::Queue").with_attributes(["Arn"]))
    .unwrap();
  let value = app.get_att(queue, "Arn").unwrap();
  consumer(&mut app, nested, "User", value);

  let prepared = app.prepare().unwrap();
  assert!(prepared.references().is_empty());

  let assembly = app.synth().unwrap();
  let template = nested_template(&app, &assembly, nested);
  assert!(template.parameters.is_empty());
  assert!(template.outputs.is_empty());
  assert_eq!(*consumed(template, "User"), Primitive::get_att("Queue", "Arn"));
}

// =============================================================================
// Ancestor to nested descendant
// =============================================================================

#[test]
fn parent_value_becomes_a_parameter_of_the_nested_stack() {
  let (mut app, parent) = app_with_stack("Parent");
  let bucket = resource(&mut app, parent, "Bucket", "AWS::S3::Bucket");
  let nested = app.add_nested_stack(parent, "Nested").unwrap();
  let value = app.reference(bucket).unwrap();
  consumer(&mut app, nested, "User", value);

  let assembly = app.synth().unwrap();
  let param = reference_parameter_name(&["Parent", "Bucket"], "Ref");

  let inner = nested_template(&app, &assembly, nested);
  assert_eq!(reference_parameters(inner), vec![param.as_str()]);
  assert_eq!(inner.parameters[&param].param_type, "String");
  assert_eq!(*consumed(inner, "User"), Primitive::reference(param.clone()));

  let outer = top_template(&assembly, "Parent");
  assert_eq!(passed_parameters(&app, outer, nested)[&param], Primitive::reference("Bucket"));
  assert!(outer.outputs.is_empty());
}

#[test]
fn one_parameter_per_crossed_level() {
  let (mut app, parent) = app_with_stack("Parent");
  let bucket = resource(&mut app, parent, "Bucket", "AWS::S3::Bucket");
  let n1 = app.add_nested_stack(parent, "N1").unwrap();
  let n2 = app.add_nested_stack(n1, "N2").unwrap();
  let value = app.reference(bucket).unwrap();
  consumer(&mut app, n2, "User", value);

  let assembly = app.synth().unwrap();
  let p1 = reference_parameter_name(&["Parent", "Bucket"], "Ref");
  let p2 = reference_parameter_name(&["Parent".to_string(), "N1".to_string(), p1.clone()], "Ref");

  let t1 = nested_template(&app, &assembly, n1);
  let t2 = nested_template(&app, &assembly, n2);
  assert!(t1.parameters.contains_key(&p1));
  assert!(!t1.parameters.contains_key(&p2));
  assert_eq!(reference_parameters(t2), vec![p2.as_str()]);

  let top = top_template(&assembly, "Parent");
  assert_eq!(passed_parameters(&app, top, n1)[&p1], Primitive::reference("Bucket"));
  assert_eq!(passed_parameters(&app, t1, n2)[&p2], Primitive::reference(p1));
  assert_eq!(*consumed(t2, "User"), Primitive::reference(p2));
}

#[test]
fn nested_stacks_in_groups_are_wired_through_the_enclosing_stack() {
  let (mut app, parent) = app_with_stack("Parent");
  let bucket = resource(&mut app, parent, "Bucket", "AWS::S3::Bucket");
  let group = app.add_group(parent, "Group").unwrap();
  let nested = app.add_nested_stack(group, "Nested").unwrap();
  let value = app.reference(bucket).unwrap();
  consumer(&mut app, nested, "User", value);

  let assembly = app.synth().unwrap();
  let param = reference_parameter_name(&["Parent", "Bucket"], "Ref");
  let outer = top_template(&assembly, "Parent");
  assert_eq!(passed_parameters(&app, outer, nested)[&param], Primitive::reference("Bucket"));
}

// =============================================================================
// Nested descendant to ancestor
// =============================================================================

#[test]
fn nested_value_becomes_an_output_read_by_the_parent() {
  let (mut app, parent) = app_with_stack("Parent");
  let nested = app.add_nested_stack(parent, "Nested").unwrap();
  let topic = resource(&mut app, nested, "Topic", "AWS::SNS::Topic");
  let value = app.reference(topic).unwrap();
  consumer(&mut app, parent, "Subscription", value);

  let assembly = app.synth().unwrap();
  let output = output_name(&["Parent", "Nested", "Topic"], "Ref");

  let inner = nested_template(&app, &assembly, nested);
  assert_eq!(inner.outputs.len(), 1);
  assert_eq!(inner.outputs[&output].value, Primitive::reference("Topic"));
  assert!(inner.outputs[&output].export.is_none());

  let outer = top_template(&assembly, "Parent");
  let resource_id = app.tree().nested_stack_resource_id(nested).unwrap();
  assert_eq!(
    *consumed(outer, "Subscription"),
    Primitive::nested_output(resource_id.clone(), &output)
  );
  assert_eq!(
    consumed(outer, "Subscription").to_string(),
    format!("{resource_id}.Outputs.{output}")
  );
  assert!(outer.outputs.is_empty());
}

#[test]
fn one_output_per_crossed_level() {
  let (mut app, parent) = app_with_stack("Parent");
  let n1 = app.add_nested_stack(parent, "N1").unwrap();
  let n2 = app.add_nested_stack(n1, "N2").unwrap();
  let topic = resource(&mut app, n2, "Topic", "AWS::SNS::Topic");
  let value = app.reference(topic).unwrap();
  consumer(&mut app, parent, "Subscription", value);

  let assembly = app.synth().unwrap();
  let tree = app.tree();
  let o2 = output_name(&["Parent", "N1", "N2", "Topic"], "Ref");
  let r2 = tree.nested_stack_resource_id(n2).unwrap();
  let o1 = output_name(&tree.nested_stack_resource_path(n2).unwrap(), &format!("Outputs.{o2}"));
  let r1 = tree.nested_stack_resource_id(n1).unwrap();

  let t2 = nested_template(&app, &assembly, n2);
  let t1 = nested_template(&app, &assembly, n1);
  assert_eq!(t2.outputs.len(), 1);
  assert_eq!(t1.outputs.len(), 1);
  assert_eq!(t1.outputs[&o1].value, Primitive::nested_output(r2, &o2));

  let top = top_template(&assembly, "Parent");
  assert_eq!(*consumed(top, "Subscription"), Primitive::nested_output(r1, &o1));
}

// =============================================================================
// Siblings nested under a shared parent
// =============================================================================

#[test]
fn sibling_nested_stacks_exchange_values_through_the_parent() {
  let (mut app, parent) = app_with_stack("Parent");
  let producer = app.add_nested_stack(parent, "Producer").unwrap();
  let consumer_stack = app.add_nested_stack(parent, "Consumer").unwrap();
  let queue = app
    .add_resource(producer, "Queue", CfnResource::new("AWS::SQS::Queue").with_attributes(["Arn"]))
    .unwrap();
  let value = app.get_att(queue, "Arn").unwrap();
  consumer(&mut app, consumer_stack, "Reader", value);

  let prepared = app.prepare().unwrap();
  assert_eq!(prepared.references()[0].1, Boundary::SiblingNestedUnderSharedParent);
  assert_eq!(prepared.graph().edge_count(), 0);

  let assembly = app.synth().unwrap();
  let tree = app.tree();
  let output = output_name(&["Parent", "Producer", "Queue"], "Arn");
  let producer_resource = tree.nested_stack_resource_id(producer).unwrap();
  let param = reference_parameter_name(
    &tree.nested_stack_resource_path(producer).unwrap(),
    &format!("Outputs.{output}"),
  );

  let produced = nested_template(&app, &assembly, producer);
  assert_eq!(produced.outputs[&output].value, Primitive::get_att("Queue", "Arn"));

  let top = top_template(&assembly, "Parent");
  assert!(top.outputs.is_empty());
  assert_eq!(
    passed_parameters(&app, top, consumer_stack)[&param],
    Primitive::nested_output(producer_resource, &output)
  );

  let consuming = nested_template(&app, &assembly, consumer_stack);
  assert_eq!(reference_parameters(consuming), vec![param.as_str()]);
  assert_eq!(*consumed(consuming, "Reader"), Primitive::reference(param));
}

// =============================================================================
// Cross top-level
// =============================================================================

#[test]
fn cross_stack_reference_exports_and_imports() {
  let mut app = stackweave_lib::App::new();
  let s1 = add_stack(&mut app, "S1");
  let s2 = add_stack(&mut app, "S2");
  let bucket = resource(&mut app, s1, "Bucket", "AWS::S3::Bucket");
  let value = app.reference(bucket).unwrap();
  consumer(&mut app, s2, "First", value.clone());
  consumer(&mut app, s2, "Second", value);

  let assembly = app.synth().unwrap();
  let output_id = export_output_id(&Primitive::reference("Bucket").to_json_string().unwrap());
  let name = export_name("S1", &output_id);
  assert!(output_id.starts_with("ExportsOutputRefBucket"));

  let producer = top_template(&assembly, "S1");
  assert_eq!(producer.export_names(), vec![name.as_str()]);
  assert_eq!(producer.outputs[&output_id].value, Primitive::reference("Bucket"));

  let consuming = top_template(&assembly, "S2");
  assert_eq!(*consumed(consuming, "First"), Primitive::ImportValue(name.clone()));
  assert_eq!(*consumed(consuming, "Second"), Primitive::ImportValue(name));
  assert!(consuming.outputs.is_empty());

  assert_eq!(assembly.manifest.artifacts["S2"].dependencies, vec!["S1".to_string()]);
  assert!(assembly.manifest.artifacts["S1"].dependencies.is_empty());
}

#[test]
fn many_references_make_one_dependency() {
  let mut app = stackweave_lib::App::new();
  let s1 = add_stack(&mut app, "S1");
  let s2 = add_stack(&mut app, "S2");
  let queue = app
    .add_resource(s1, "Queue", CfnResource::new("AWS::SQS::Queue").with_attributes(["Arn", "QueueName"]))
    .unwrap();
  for (id, attribute) in [("A", "Arn"), ("B", "QueueName")] {
    let value = app.get_att(queue, attribute).unwrap();
    consumer(&mut app, s2, id, value);
  }

  let prepared = app.prepare().unwrap();
  assert_eq!(prepared.graph().edge_count(), 1);

  let assembly = app.synth().unwrap();
  assert_eq!(top_template(&assembly, "S1").export_names().len(), 2);
  assert_eq!(assembly.manifest.artifacts["S2"].dependencies, vec!["S1".to_string()]);
}

#[test]
fn nested_consumer_imports_in_its_top_level_stack() {
  let mut app = stackweave_lib::App::new();
  let stack1 = add_stack(&mut app, "Stack1");
  let stack2 = add_stack(&mut app, "Stack2");
  let nested = app.add_nested_stack(stack1, "NestedUnderStack1").unwrap();
  let source = app
    .add_resource(stack2, "ResourceInStack2", CfnResource::new("MyResource").with_attributes(["MyAttribute"]))
    .unwrap();
  let value = app.get_att(source, "MyAttribute").unwrap();
  consumer(&mut app, nested, "ResourceInNestedStack1", value);

  let assembly = app.synth().unwrap();
  let output_id = export_output_id(&Primitive::get_att("ResourceInStack2", "MyAttribute").to_json_string().unwrap());
  let name = export_name("Stack2", &output_id);
  assert!(output_id.starts_with("ExportsOutputFnGetAttResourceInStack2MyAttribute"));
  assert_eq!(top_template(&assembly, "Stack2").export_names(), vec![name.as_str()]);

  let param = reference_parameter_name(&["Stack2", "ResourceInStack2"], "MyAttribute");
  let top = top_template(&assembly, "Stack1");
  assert_eq!(passed_parameters(&app, top, nested)[&param], Primitive::ImportValue(name));

  let inner = nested_template(&app, &assembly, nested);
  assert_eq!(*consumed(inner, "ResourceInNestedStack1"), Primitive::reference(param));

  assert_eq!(assembly.manifest.artifacts["Stack1"].dependencies, vec!["Stack2".to_string()]);
  assert!(assembly.manifest.artifacts["Stack2"].dependencies.is_empty());
}

#[test]
fn nested_producer_is_exported_by_its_top_level_stack() {
  let mut app = stackweave_lib::App::new();
  let stack1 = add_stack(&mut app, "Stack1");
  let stack2 = add_stack(&mut app, "Stack2");
  let nested = app.add_nested_stack(stack1, "NestedUnderStack1").unwrap();
  let source = app
    .add_resource(nested, "ResourceInNestedStack", CfnResource::new("MyResource").with_attributes(["MyAttribute"]))
    .unwrap();
  let value = app.get_att(source, "MyAttribute").unwrap();
  consumer(&mut app, stack2, "ResourceInStack2", value);

  let assembly = app.synth().unwrap();
  let output = output_name(&["Stack1", "NestedUnderStack1", "ResourceInNestedStack"], "MyAttribute");
  assert!(output.starts_with("Stack1NestedUnderStack1ResourceInNestedStack"));

  let inner = nested_template(&app, &assembly, nested);
  assert_eq!(inner.outputs[&output].value, Primitive::get_att("ResourceInNestedStack", "MyAttribute"));
  assert!(inner.outputs[&output].export.is_none());

  let resource_id = app.tree().nested_stack_resource_id(nested).unwrap();
  let exported = Primitive::nested_output(resource_id, &output);
  let output_id = export_output_id(&exported.to_json_string().unwrap());
  let name = export_name("Stack1", &output_id);

  let producer = top_template(&assembly, "Stack1");
  assert_eq!(producer.outputs[&output_id].value, exported);
  assert_eq!(producer.export_names(), vec![name.as_str()]);

  let consuming = top_template(&assembly, "Stack2");
  assert_eq!(*consumed(consuming, "ResourceInStack2"), Primitive::ImportValue(name));
  assert_eq!(assembly.manifest.artifacts["Stack2"].dependencies, vec!["Stack1".to_string()]);
}
