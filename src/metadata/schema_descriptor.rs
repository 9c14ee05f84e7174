use crate::error::{Error, Result};
use crate::schema::types::SchemaNode;
use crate::schema::Repetition;

use super::column_descriptor::ColumnDescriptor;

/// A schema descriptor: the schema tree together with one
/// [`ColumnDescriptor`] per primitive leaf, in depth-first order.
#[derive(Debug, Clone)]
pub struct SchemaDescriptor {
    // The root group node (the "message" type).
    root: SchemaNode,

    leaves: Vec<ColumnDescriptor>,

    // For every leaf, the index of the top-level field it belongs to.
    leaf_to_field: Vec<usize>,
}

impl SchemaDescriptor {
    /// Creates a new schema descriptor from the root of a schema tree.
    pub fn try_new(root: SchemaNode) -> Result<Self> {
        if !root.is_group() {
            return Err(Error::corrupt("the schema root must be a group"));
        }
        let mut leaves = vec![];
        let mut leaf_to_field = Vec::new();
        for (field_index, field) in root.fields().iter().enumerate() {
            let mut path = vec![];
            build_tree(
                field,
                field_index,
                0,
                0,
                &mut leaves,
                &mut leaf_to_field,
                &mut path,
            );
        }

        Ok(Self {
            root,
            leaves,
            leaf_to_field,
        })
    }

    /// Returns the [`ColumnDescriptor`] of the `i`-th leaf.
    pub fn column(&self, i: usize) -> &ColumnDescriptor {
        &self.leaves[i]
    }

    /// All leaf descriptors, in depth-first order.
    pub fn columns(&self) -> &[ColumnDescriptor] {
        &self.leaves
    }

    /// Returns the number of leaf-level columns.
    pub fn num_columns(&self) -> usize {
        self.leaves.len()
    }

    /// The top-level fields of the schema.
    pub fn fields(&self) -> &[SchemaNode] {
        self.root.fields()
    }

    /// The root node of the schema tree.
    pub fn root(&self) -> &SchemaNode {
        &self.root
    }

    /// Returns the schema name.
    pub fn name(&self) -> &str {
        self.root.name()
    }

    /// The index of the top-level field the `i`-th leaf belongs to.
    pub fn leaf_field_index(&self, i: usize) -> usize {
        self.leaf_to_field[i]
    }

    /// The indices of the leaves under the top-level field `field_index`.
    pub fn leaves_of_field(&self, field_index: usize) -> Vec<usize> {
        self.leaf_to_field
            .iter()
            .enumerate()
            .filter(|(_, field)| **field == field_index)
            .map(|(leaf, _)| leaf)
            .collect()
    }
}

fn build_tree(
    node: &SchemaNode,
    field_index: usize,
    mut max_rep_level: i16,
    mut max_def_level: i16,
    leaves: &mut Vec<ColumnDescriptor>,
    leaf_to_field: &mut Vec<usize>,
    path_so_far: &mut Vec<String>,
) {
    path_so_far.push(node.name().to_string());
    match node.repetition() {
        Repetition::Optional => {
            max_def_level += 1;
        }
        Repetition::Repeated => {
            max_def_level += 1;
            max_rep_level += 1;
        }
        Repetition::Required => {}
    }

    match node {
        SchemaNode::Primitive { .. } => {
            leaves.push(ColumnDescriptor::new(
                node.clone(),
                max_def_level,
                max_rep_level,
                path_so_far.clone(),
                leaves.len(),
            ));
            leaf_to_field.push(field_index);
        }
        SchemaNode::Group { fields, .. } => {
            for field in fields {
                build_tree(
                    field,
                    field_index,
                    max_rep_level,
                    max_def_level,
                    leaves,
                    leaf_to_field,
                    path_so_far,
                );
                path_so_far.pop();
            }
        }
    }
}
