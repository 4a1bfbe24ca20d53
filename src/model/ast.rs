//! Serde mirror of the Smithy JSON AST.
//!
//! Only the parts the server core needs are modelled; unknown top-level keys
//! and shape properties are ignored.
use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Deserialize)]
pub struct AstModel {
    pub smithy: String,
    #[serde(default)]
    pub shapes: IndexMap<String, AstShape>,
}

#[derive(Debug, Deserialize)]
pub struct AstTarget {
    pub target: String,
}

#[derive(Debug, Deserialize)]
pub struct AstMember {
    pub target: String,
    #[serde(default)]
    pub traits: IndexMap<String, Value>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum AstShape {
    Blob(AstSimple),
    Boolean(AstSimple),
    String(AstSimple),
    Byte(AstSimple),
    Short(AstSimple),
    Integer(AstSimple),
    Long(AstSimple),
    Float(AstSimple),
    Double(AstSimple),
    Timestamp(AstSimple),
    Document(AstSimple),
    List {
        member: AstMember,
        #[serde(default)]
        traits: IndexMap<String, Value>,
    },
    Map {
        key: AstMember,
        value: AstMember,
        #[serde(default)]
        traits: IndexMap<String, Value>,
    },
    Structure(AstAggregate),
    Union(AstAggregate),
    Operation {
        #[serde(default)]
        input: Option<AstTarget>,
        #[serde(default)]
        output: Option<AstTarget>,
        #[serde(default)]
        errors: Vec<AstTarget>,
        #[serde(default)]
        traits: IndexMap<String, Value>,
    },
    Service {
        #[serde(default)]
        version: String,
        #[serde(default)]
        operations: Vec<AstTarget>,
        #[serde(default)]
        traits: IndexMap<String, Value>,
    },
}

#[derive(Debug, Default, Deserialize)]
pub struct AstSimple {
    #[serde(default)]
    pub traits: IndexMap<String, Value>,
}

#[derive(Debug, Default, Deserialize)]
pub struct AstAggregate {
    #[serde(default)]
    pub members: IndexMap<String, AstMember>,
    #[serde(default)]
    pub traits: IndexMap<String, Value>,
}
