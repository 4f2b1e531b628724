//! Consistency checks run on a raw document before resolution.
//!
//! Every check appends human-readable problems instead of failing fast so
//! one load reports everything that is wrong with a document.

use std::collections::{BTreeMap, BTreeSet};

use relnorm_model::{Result, SchemaError, relation_id_column, split_repeating};

use crate::document::{EntityTypeDefinition, SchemaDocument};

/// Validate a document, returning every problem found.
pub fn validate_document(document: &SchemaDocument) -> Result<()> {
    let mut problems = Vec::new();

    for (name, definition) in &document.types {
        check_hierarchy_references(document, name, definition, &mut problems);
    }
    // Cycle and attribute checks walk the hierarchy, so they only make
    // sense once every reference resolves.
    if problems.is_empty() {
        for name in document.type_names() {
            check_inheritance_cycle(document, name, &mut problems);
        }
    }
    if problems.is_empty() {
        for (name, definition) in &document.types {
            let attributes = inherited_attributes(document, name);
            check_forward_relations(name, definition, &attributes, &mut problems);
            check_multivalued_columns(document, name, definition, &mut problems);
            check_attribute_consistency(name, definition, &attributes, &mut problems);
            check_disjoint_categories(document, name, definition, &attributes, &mut problems);
        }
        check_forward_relation_cycles(document, &mut problems);
    }

    if problems.is_empty() {
        Ok(())
    } else {
        tracing::debug!(count = problems.len(), "schema validation failed");
        Err(SchemaError::Invalid { problems })
    }
}

/// Attributes a type possesses through its own declaration and its ancestors.
pub(crate) fn inherited_attributes<'a>(
    document: &'a SchemaDocument,
    name: &'a str,
) -> BTreeSet<&'a str> {
    std::iter::once(name)
        .chain(document.ancestors(name))
        .filter_map(|type_name| document.get(type_name))
        .flat_map(|definition| definition.attributes.iter().map(String::as_str))
        .collect()
}

fn check_hierarchy_references(
    document: &SchemaDocument,
    name: &str,
    definition: &EntityTypeDefinition,
    problems: &mut Vec<String>,
) {
    if let Some(parent) = &definition.parent_type
        && !document.contains(parent)
    {
        problems.push(format!(
            "Error in {name}: parent '{parent}' does not exist in schema."
        ));
    }
    for child in &definition.child_types {
        match document.get(child) {
            None => problems.push(format!(
                "Error in {name}: child '{child}' does not exist in schema."
            )),
            Some(child_definition) if child_definition.parent_type.as_deref() != Some(name) => {
                problems.push(format!(
                    "Error in {name}: lists '{child}' as a child, but '{child}' does not list '{name}' as its parent."
                ));
            }
            Some(_) => {}
        }
    }
    for (relation, target) in definition
        .forward_relations
        .iter()
        .chain(definition.multivalued_columns.iter())
    {
        if !document.contains(target) {
            problems.push(format!(
                "Error in {name}: relation '{relation}' points to '{target}', which does not exist."
            ));
        }
    }
}

fn check_inheritance_cycle(document: &SchemaDocument, name: &str, problems: &mut Vec<String>) {
    let mut chain = vec![name];
    let mut current = document.get(name).and_then(|def| def.parent_type.as_deref());
    while let Some(parent) = current {
        let revisits = chain.contains(&parent);
        chain.push(parent);
        if revisits {
            // Report each cycle once, from its smallest member.
            if parent == name && chain[..chain.len() - 1].iter().all(|member| name <= *member) {
                problems.push(format!(
                    "Error in {name}: inheritance chain {} is cyclic.",
                    chain.join(" -> ")
                ));
            }
            return;
        }
        current = document.get(parent).and_then(|def| def.parent_type.as_deref());
    }
}

fn check_forward_relations(
    name: &str,
    definition: &EntityTypeDefinition,
    attributes: &BTreeSet<&str>,
    problems: &mut Vec<String>,
) {
    for relation in definition.forward_relations.keys() {
        let id_column = relation_id_column(relation);
        if !attributes.contains(id_column.as_str()) {
            problems.push(format!(
                "Error in {name}: forward_relation key '{relation}' requires attribute '{id_column}'."
            ));
        }
    }
}

fn check_multivalued_columns(
    document: &SchemaDocument,
    name: &str,
    definition: &EntityTypeDefinition,
    problems: &mut Vec<String>,
) {
    for (column, target) in &definition.multivalued_columns {
        let Some(back_reference) = definition.reverse_relation_names.get(column) else {
            problems.push(format!(
                "Error in {name}: reverse relation column '{column}' does not have an entry in \
                 'reverse_relation_names'. This is needed to detect which column refers back \
                 to this table when normalizing."
            ));
            continue;
        };
        if !inherited_attributes(document, target).contains(back_reference.as_str()) {
            problems.push(format!(
                "Error in {name}: back-reference '{back_reference}' for '{column}' must be an attribute of {target}."
            ));
        }
    }
    for column in definition.reverse_relation_names.keys() {
        if !definition.multivalued_columns.contains_key(column) {
            problems.push(format!(
                "Error in {name}: reverse_relation_names entry '{column}' has no matching multivalued column."
            ));
        }
    }
}

fn check_attribute_consistency(
    name: &str,
    definition: &EntityTypeDefinition,
    attributes: &BTreeSet<&str>,
    problems: &mut Vec<String>,
) {
    let categories: [(&str, Vec<&String>); 3] = [
        ("enum_columns", definition.enum_columns.keys().collect()),
        ("repeating_columns", definition.repeating_columns.iter().collect()),
        ("required_attributes", definition.required_attributes.iter().collect()),
    ];
    for (category, columns) in categories {
        for column in columns {
            if !attributes.contains(column.as_str()) {
                problems.push(format!(
                    "Error in {name}: {category} '{column}' must be listed in attributes."
                ));
            }
        }
    }
}

fn check_disjoint_categories(
    document: &SchemaDocument,
    name: &str,
    definition: &EntityTypeDefinition,
    attributes: &BTreeSet<&str>,
    problems: &mut Vec<String>,
) {
    let forward: BTreeSet<&str> = definition.forward_relations.keys().map(String::as_str).collect();
    let multivalued: BTreeSet<&str> =
        definition.multivalued_columns.keys().map(String::as_str).collect();
    for token in attributes.intersection(&forward) {
        problems.push(format!(
            "Error in {name}: '{token}' is both an attribute and a forward relation."
        ));
    }
    for token in attributes.intersection(&multivalued) {
        problems.push(format!(
            "Error in {name}: '{token}' is both an attribute and a multivalued column."
        ));
    }
    for token in forward.intersection(&multivalued) {
        problems.push(format!(
            "Error in {name}: '{token}' is both a forward relation and a multivalued column."
        ));
    }

    let repeating: BTreeSet<&str> = std::iter::once(name)
        .chain(document.ancestors(name))
        .filter_map(|type_name| document.get(type_name))
        .flat_map(|def| def.repeating_columns.iter().map(String::as_str))
        .collect();
    for token in attributes.iter().chain(&forward).chain(&multivalued) {
        if let Some((base, _)) = split_repeating(token)
            && repeating.contains(base)
        {
            problems.push(format!(
                "Error in {name}: '{token}' collides with repeating column '{base}'."
            ));
        }
    }
}

/// Forward relations must form a DAG over declared types, otherwise
/// splitting a relation could re-embed its origin.
fn check_forward_relation_cycles(document: &SchemaDocument, problems: &mut Vec<String>) {
    #[derive(Clone, Copy, PartialEq)]
    enum Mark {
        Visiting,
        Done,
    }

    fn visit<'a>(
        document: &'a SchemaDocument,
        name: &'a str,
        marks: &mut BTreeMap<&'a str, Mark>,
        stack: &mut Vec<&'a str>,
        problems: &mut Vec<String>,
    ) {
        match marks.get(name) {
            Some(Mark::Done) => return,
            Some(Mark::Visiting) => {
                let start = stack.iter().position(|member| *member == name).unwrap_or(0);
                let mut cycle: Vec<&str> = stack[start..].to_vec();
                cycle.push(name);
                problems.push(format!(
                    "Error in {}: forward relations form a cycle {}.",
                    cycle[0],
                    cycle.join(" -> ")
                ));
                return;
            }
            None => {}
        }
        marks.insert(name, Mark::Visiting);
        stack.push(name);
        if let Some(definition) = document.get(name) {
            for target in definition.forward_relations.values() {
                visit(document, target, marks, stack, problems);
            }
        }
        stack.pop();
        marks.insert(name, Mark::Done);
    }

    let mut marks = BTreeMap::new();
    for name in document.type_names() {
        let mut stack = Vec::new();
        visit(document, name, &mut marks, &mut stack, problems);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn problems_for(source: &str) -> Vec<String> {
        let document = SchemaDocument::from_yaml_str(source).expect("parse");
        match validate_document(&document) {
            Ok(()) => Vec::new(),
            Err(error) => error.problems().to_vec(),
        }
    }

    #[test]
    fn accepts_consistent_document() {
        let problems = problems_for(
            r#"
Transaction:
  attributes: [id, amount, donor_id]
  forward_relations: {donor: Transactor}
  repeating_columns: [amount]
Transactor:
  attributes: [id, name, state]
  required_attributes: [name]
"#,
        );
        assert!(problems.is_empty(), "{problems:?}");
    }

    #[test]
    fn reports_missing_parent() {
        let problems = problems_for(
            r#"
Teacher:
  attributes: [position]
  parent_type: Person
"#,
        );
        assert_eq!(
            problems,
            vec!["Error in Teacher: parent 'Person' does not exist in schema.".to_string()]
        );
    }

    #[test]
    fn reports_child_without_parent_link() {
        let problems = problems_for(
            r#"
Person:
  attributes: [id, name]
  child_types: [Teacher]
Teacher:
  attributes: [position]
"#,
        );
        assert_eq!(problems.len(), 1);
        assert!(problems[0].contains("does not list 'Person' as its parent"));
    }

    #[test]
    fn reports_inheritance_cycle_once() {
        let problems = problems_for(
            r#"
A:
  attributes: [a]
  parent_type: B
B:
  attributes: [b]
  parent_type: A
"#,
        );
        assert_eq!(
            problems,
            vec!["Error in A: inheritance chain A -> B -> A is cyclic.".to_string()]
        );
    }

    #[test]
    fn reports_attribute_consistency() {
        let problems = problems_for(
            r#"
Person:
  attributes: [id, name, dob]
  enum_columns:
    gender: [Male, Female, Other]
"#,
        );
        assert_eq!(
            problems,
            vec!["Error in Person: enum_columns 'gender' must be listed in attributes.".to_string()]
        );
    }

    #[test]
    fn reports_forward_key_without_id_attribute() {
        let problems = problems_for(
            r#"
Person:
  attributes: [id, name]
  forward_relations: {homeroom: Class}
Class:
  attributes: [id]
"#,
        );
        assert_eq!(
            problems,
            vec![
                "Error in Person: forward_relation key 'homeroom' requires attribute 'homeroom_id'."
                    .to_string()
            ]
        );
    }

    #[test]
    fn reports_missing_back_reference_name() {
        let problems = problems_for(
            r#"
Person:
  attributes: [id, name]
  reverse_relations: {address: Address}
Address:
  attributes: [city, person_id]
"#,
        );
        assert_eq!(problems.len(), 1);
        assert!(problems[0].contains(
            "reverse relation column 'address' does not have an entry in 'reverse_relation_names'"
        ));
    }

    #[test]
    fn reports_forward_relation_cycle() {
        let problems = problems_for(
            r#"
Individual:
  attributes: [id, employer_id]
  forward_relations: {employer: Organization}
Organization:
  attributes: [id, contact_id]
  forward_relations: {contact: Individual}
"#,
        );
        assert_eq!(
            problems,
            vec![
                "Error in Individual: forward relations form a cycle Individual -> Organization -> Individual."
                    .to_string()
            ]
        );
    }

    #[test]
    fn reports_overlapping_categories() {
        let problems = problems_for(
            r#"
Transaction:
  attributes: [id, donor, donor_id, amount-1, amount]
  forward_relations: {donor: Transactor}
  repeating_columns: [amount]
Transactor:
  attributes: [id]
"#,
        );
        assert!(problems.iter().any(|p| p.contains("'donor' is both an attribute and a forward relation")));
        assert!(problems.iter().any(|p| p.contains("'amount-1' collides with repeating column 'amount'")));
    }
}
