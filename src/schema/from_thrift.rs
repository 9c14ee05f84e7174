use parquet_format_safe::SchemaElement;

use crate::error::{Error, Result};

use super::types::{
    converted_to_group_converted, converted_to_primitive_converted, type_to_physical_type,
    FieldInfo, SchemaNode,
};
use super::Repetition;

impl SchemaNode {
    /// Builds the schema tree from the flat list of thrift elements.
    pub fn try_from_thrift(elements: &[SchemaElement]) -> Result<SchemaNode> {
        let mut index = 0;
        let mut schema_nodes = Vec::new();
        while index < elements.len() {
            let (next_index, node) = from_thrift_helper(elements, index)?;
            index = next_index;
            schema_nodes.push(node);
        }
        if schema_nodes.len() != 1 {
            return Err(Error::corrupt(format!(
                "expected exactly one root node, but found {}",
                schema_nodes.len()
            )));
        }

        Ok(schema_nodes.remove(0))
    }
}

/// Constructs a node from `elements`, starting at `index`. Returns the
/// index of the next sibling together with the node.
fn from_thrift_helper(elements: &[SchemaElement], index: usize) -> Result<(usize, SchemaNode)> {
    // There is only one message type node in the schema tree, at index 0.
    let is_root_node = index == 0;

    let element = elements
        .get(index)
        .ok_or_else(|| Error::corrupt("the schema tree refers to a missing element"))?;
    let name = element.name.clone();
    let converted_type = element.converted_type;

    match element.num_children {
        // parquet-cpp sometimes sets num_children to 0 for primitive types.
        None | Some(0) => {
            let repetition: Repetition = element
                .repetition_type
                .ok_or_else(|| {
                    Error::corrupt("a repetition must be defined for a primitive type")
                })?
                .try_into()?;
            let physical_type = element
                .type_
                .ok_or_else(|| Error::corrupt("a physical type must be defined for a primitive"))?;
            let physical_type = type_to_physical_type(&physical_type, element.type_length)?;

            let converted_type = match converted_type {
                Some(converted_type) => {
                    let maybe_decimal = match (element.precision, element.scale) {
                        (Some(precision), Some(scale)) => Some((precision, scale)),
                        (None, None) => None,
                        _ => {
                            return Err(Error::corrupt(
                                "when precision or scale are defined, both must be defined",
                            ))
                        }
                    };
                    Some(converted_to_primitive_converted(
                        &converted_type,
                        maybe_decimal,
                    )?)
                }
                None => None,
            };
            // LogicalType is only present in v2 files; ConvertedType is
            // populated regardless of the writer version.
            let logical_type = element
                .logical_type
                .clone()
                .map(|x| x.try_into())
                .transpose()?;

            let node = SchemaNode::Primitive {
                info: FieldInfo {
                    name,
                    repetition,
                    id: element.field_id,
                },
                physical_type,
                converted_type,
                logical_type,
            };
            Ok((index + 1, node))
        }
        Some(n) => {
            let repetition = match element.repetition_type {
                Some(repetition) => repetition.try_into()?,
                None if is_root_node => Repetition::Optional,
                None => {
                    return Err(Error::corrupt(
                        "a repetition must be defined for a non-root group",
                    ))
                }
            };
            let mut fields = vec![];
            let mut next_index = index + 1;
            for _ in 0..n {
                let (index, child) = from_thrift_helper(elements, next_index)?;
                next_index = index;
                fields.push(child);
            }

            let converted_type = match converted_type {
                Some(converted_type) if !is_root_node => {
                    Some(converted_to_group_converted(&converted_type)?)
                }
                _ => None,
            };
            let logical_type = if is_root_node {
                None
            } else {
                element
                    .logical_type
                    .clone()
                    .map(|x| x.try_into())
                    .transpose()?
            };

            let node = SchemaNode::Group {
                info: FieldInfo {
                    name,
                    repetition,
                    id: element.field_id,
                },
                converted_type,
                logical_type,
                fields,
            };
            Ok((next_index, node))
        }
    }
}
