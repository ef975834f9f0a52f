//! Index schema for embedded chunks and its REST definition.

use serde_json::{Value, json};

/// Key field of the chunk index.
pub const KEY_FIELD: &str = "id";
/// Vector field holding chunk embeddings.
pub const CONTENT_VECTOR_FIELD: &str = "content_vector";
/// Fields returned by searches.
pub const SELECT_FIELDS: &str = "id,content,title,source,chunk_index";

const VECTOR_PROFILE: &str = "default-vector-profile";
const VECTOR_ALGORITHM: &str = "default-hnsw";

/// Scalar type of a filterable field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// UTF-8 string.
    String,
    /// 32-bit signed integer.
    Int32,
}

impl FieldKind {
    fn edm_type(self) -> &'static str {
        match self {
            Self::String => "Edm.String",
            Self::Int32 => "Edm.Int32",
        }
    }
}

/// Approximate nearest-neighbour algorithm for the vector field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VectorAlgorithm {
    /// Hierarchical navigable small world graph.
    Hnsw,
}

/// Similarity metric used by the vector algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimilarityMetric {
    /// Cosine similarity.
    Cosine,
    /// Euclidean distance.
    Euclidean,
    /// Dot product.
    DotProduct,
}

impl SimilarityMetric {
    fn as_str(self) -> &'static str {
        match self {
            Self::Cosine => "cosine",
            Self::Euclidean => "euclidean",
            Self::DotProduct => "dotProduct",
        }
    }
}

/// Vector field configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VectorField {
    /// Field name.
    pub name: String,
    /// Number of dimensions per vector.
    pub dimension: usize,
    /// Graph algorithm used for approximate search.
    pub algorithm: VectorAlgorithm,
    /// Similarity metric.
    pub metric: SimilarityMetric,
}

/// Filterable metadata field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterableField {
    /// Field name.
    pub name: String,
    /// Scalar type.
    pub kind: FieldKind,
}

/// Desired index layout. An existing index with the same name is assumed to match it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexSchema {
    /// Index name.
    pub name: String,
    /// Document key field.
    pub key_field: String,
    /// Full-text searchable string fields.
    pub searchable_fields: Vec<String>,
    /// Filterable metadata fields.
    pub filterable_fields: Vec<FilterableField>,
    /// Embedding field.
    pub vector_field: VectorField,
    /// Semantic configuration created alongside the index, if any.
    pub semantic_configuration: Option<String>,
}

impl IndexSchema {
    /// Schema for chunk documents: `content`/`title` searchable, `source`/`chunk_index`
    /// filterable, and an HNSW cosine vector field of `dimension` floats.
    pub fn for_chunks(
        name: impl Into<String>,
        dimension: usize,
        semantic_configuration: Option<String>,
    ) -> Self {
        Self {
            name: name.into(),
            key_field: KEY_FIELD.to_string(),
            searchable_fields: vec!["content".to_string(), "title".to_string()],
            filterable_fields: vec![
                FilterableField {
                    name: "source".to_string(),
                    kind: FieldKind::String,
                },
                FilterableField {
                    name: "chunk_index".to_string(),
                    kind: FieldKind::Int32,
                },
            ],
            vector_field: VectorField {
                name: CONTENT_VECTOR_FIELD.to_string(),
                dimension,
                algorithm: VectorAlgorithm::Hnsw,
                metric: SimilarityMetric::Cosine,
            },
            semantic_configuration,
        }
    }

    /// Render the index definition accepted by the create-index endpoint.
    pub fn to_definition(&self) -> Value {
        let mut fields = vec![json!({
            "name": self.key_field,
            "type": "Edm.String",
            "key": true,
            "filterable": true,
        })];

        for name in &self.searchable_fields {
            fields.push(json!({
                "name": name,
                "type": "Edm.String",
                "searchable": true,
                "retrievable": true,
            }));
        }

        for field in &self.filterable_fields {
            fields.push(json!({
                "name": field.name,
                "type": field.kind.edm_type(),
                "filterable": true,
                "retrievable": true,
            }));
        }

        fields.push(json!({
            "name": self.vector_field.name,
            "type": "Collection(Edm.Single)",
            "searchable": true,
            "retrievable": false,
            "dimensions": self.vector_field.dimension,
            "vectorSearchProfile": VECTOR_PROFILE,
        }));

        let algorithm = match self.vector_field.algorithm {
            VectorAlgorithm::Hnsw => json!({
                "name": VECTOR_ALGORITHM,
                "kind": "hnsw",
                "hnswParameters": { "metric": self.vector_field.metric.as_str() },
            }),
        };

        let mut definition = json!({
            "name": self.name,
            "fields": fields,
            "vectorSearch": {
                "algorithms": [algorithm],
                "profiles": [
                    { "name": VECTOR_PROFILE, "algorithm": VECTOR_ALGORITHM }
                ],
            },
        });

        if let Some(configuration) = &self.semantic_configuration
            && let Some(object) = definition.as_object_mut()
        {
            let content_fields: Vec<Value> = self
                .searchable_fields
                .iter()
                .filter(|name| name.as_str() != "title")
                .map(|name| json!({ "fieldName": name }))
                .collect();
            object.insert(
                "semantic".into(),
                json!({
                    "configurations": [{
                        "name": configuration,
                        "prioritizedFields": {
                            "titleField": { "fieldName": "title" },
                            "prioritizedContentFields": content_fields,
                        }
                    }]
                }),
            );
        }

        definition
    }
}
