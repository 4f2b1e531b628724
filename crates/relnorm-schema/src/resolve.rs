//! Inheritance composition.
//!
//! Runs once per type when a registry is loaded. Single-table mode flattens
//! a whole hierarchy branch into one descriptor set and points relations at
//! the hierarchy root, since that is the table every member lives in.
//! Class-table mode keeps each type's own declaration.

use relnorm_model::{InheritanceMode, Result, SchemaError};

use crate::document::{EntityTypeDefinition, SchemaDocument};
use crate::entity::{Descriptors, EntityTypeSchema};

/// Resolve one type of a validated document.
pub fn resolve_entity(
    document: &SchemaDocument,
    name: &str,
    mode: InheritanceMode,
) -> Result<EntityTypeSchema> {
    let definition = document.get(name).ok_or_else(|| SchemaError::UnknownType {
        name: name.to_string(),
    })?;

    let members: Vec<&str> = match mode {
        InheritanceMode::SingleTable => std::iter::once(name)
            .chain(document.descendants(name))
            .chain(document.ancestors(name))
            .collect(),
        InheritanceMode::ClassTable => vec![name],
    };

    let mut descriptors = Descriptors::default();
    for member in &members {
        if let Some(member_definition) = document.get(member) {
            merge(&mut descriptors, member_definition);
        }
    }

    if mode == InheritanceMode::SingleTable {
        for target in descriptors
            .forward_relations
            .values_mut()
            .chain(descriptors.multivalued_columns.values_mut())
        {
            *target = document.root_of(target).to_string();
        }
    }

    tracing::trace!(
        table_type = name,
        mode = %mode,
        members = members.len(),
        attributes = descriptors.attributes.len(),
        "resolved entity type"
    );

    let storage_type = match mode {
        InheritanceMode::SingleTable => document.root_of(name),
        InheritanceMode::ClassTable => name,
    };
    Ok(EntityTypeSchema::compile(
        name,
        mode,
        descriptors,
        definition.parent_type.clone(),
        document.children(name).into_iter().map(String::from).collect(),
    )?
    .with_storage_type(storage_type))
}

fn merge(descriptors: &mut Descriptors, definition: &EntityTypeDefinition) {
    descriptors
        .attributes
        .extend(definition.attributes.iter().cloned());
    for (relation, target) in &definition.forward_relations {
        descriptors
            .forward_relations
            .entry(relation.clone())
            .or_insert_with(|| target.clone());
    }
    for (relation, target) in &definition.multivalued_columns {
        descriptors
            .multivalued_columns
            .entry(relation.clone())
            .or_insert_with(|| target.clone());
    }
    for (relation, back_reference) in &definition.reverse_relation_names {
        descriptors
            .back_references
            .entry(relation.clone())
            .or_insert_with(|| back_reference.clone());
    }
    descriptors
        .repeating_columns
        .extend(definition.repeating_columns.iter().cloned());
    descriptors
        .required_attributes
        .extend(definition.required_attributes.iter().cloned());
    for (column, values) in &definition.enum_columns {
        descriptors
            .enum_columns
            .entry(column.clone())
            .or_default()
            .extend(values.iter().cloned());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOCUMENT: &str = r#"
Person:
  attributes: [id, name, homeroom_id]
  child_types: [Teacher, Student]
Teacher:
  attributes: [position]
  enum_columns: {position: [Head, Assistant]}
  parent_type: Person
Student:
  attributes: [grade]
  forward_relations: {homeroom: Class}
  parent_type: Person
Class:
  attributes: [id, teacher_id]
  forward_relations: {teacher: Teacher}
"#;

    #[test]
    fn single_table_flattens_branch() {
        let document = SchemaDocument::from_yaml_str(DOCUMENT).expect("parse");
        let teacher = resolve_entity(&document, "Teacher", InheritanceMode::SingleTable)
            .expect("resolve");
        assert!(teacher.attributes().contains("name"));
        assert!(teacher.attributes().contains("position"));
        assert!(!teacher.attributes().contains("grade"));

        let person = resolve_entity(&document, "Person", InheritanceMode::SingleTable)
            .expect("resolve");
        assert!(person.attributes().contains("grade"));
        assert!(person.attributes().contains("position"));
        assert_eq!(person.relation_target("homeroom"), Some("Class"));
    }

    #[test]
    fn single_table_redirects_targets_to_root() {
        let document = SchemaDocument::from_yaml_str(DOCUMENT).expect("parse");
        let class = resolve_entity(&document, "Class", InheritanceMode::SingleTable)
            .expect("resolve");
        assert_eq!(class.relation_target("teacher"), Some("Person"));

        let teacher = resolve_entity(&document, "Teacher", InheritanceMode::SingleTable)
            .expect("resolve");
        assert_eq!(teacher.storage_type(), "Person");
        assert_eq!(class.storage_type(), "Class");
    }

    #[test]
    fn class_table_keeps_own_descriptors() {
        let document = SchemaDocument::from_yaml_str(DOCUMENT).expect("parse");
        let teacher =
            resolve_entity(&document, "Teacher", InheritanceMode::ClassTable).expect("resolve");
        assert_eq!(
            teacher.attributes().iter().map(String::as_str).collect::<Vec<_>>(),
            vec!["position"]
        );
        assert_eq!(teacher.storage_type(), "Teacher");
        let class =
            resolve_entity(&document, "Class", InheritanceMode::ClassTable).expect("resolve");
        assert_eq!(class.relation_target("teacher"), Some("Teacher"));
    }

    #[test]
    fn unknown_type_is_an_error() {
        let document = SchemaDocument::from_yaml_str(DOCUMENT).expect("parse");
        let error = resolve_entity(&document, "Desk", InheritanceMode::SingleTable).unwrap_err();
        assert!(matches!(error, SchemaError::UnknownType { .. }));
    }
}
