//! Entity classes, their schemas and live instances

use crate::error::{Result, SurvolError};
use crate::moniker::Moniker;
use crate::namespace::{XSD_BOOLEAN, XSD_DATE_TIME, XSD_DOUBLE, XSD_INTEGER, XSD_STRING};
use chrono::{DateTime, SecondsFormat, Utc};
use std::fmt;
use tracing::{debug, warn};

/// Declared type of a property.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Integer,
    Unsigned,
    Float,
    Boolean,
    String,
    Timestamp,
    /// Link to an instance of the named class.
    Reference(&'static str),
}

/// Declared type of an invocation parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    Integer,
    String,
}

impl fmt::Display for ParamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamKind::Integer => write!(f, "integer"),
            ParamKind::String => write!(f, "string"),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PropertyDef {
    pub name: &'static str,
    pub kind: ValueKind,
    pub description: &'static str,
}

#[derive(Debug, Clone, Copy)]
pub struct ParameterDef {
    pub name: &'static str,
    pub kind: ParamKind,
    pub description: &'static str,
}

/// A resource kind: fixed name, identifier fields and ordered property schema.
///
/// `properties` lists the key properties first, in the order of `keys`.
#[derive(Debug)]
pub struct EntityClass {
    pub name: &'static str,
    pub description: &'static str,
    pub keys: &'static [&'static str],
    pub properties: &'static [PropertyDef],
    pub parameters: &'static [ParameterDef],
}

impl EntityClass {
    pub fn property(&self, name: &str) -> Option<&PropertyDef> {
        self.properties.iter().find(|p| p.name == name)
    }

    pub fn property_index(&self, name: &str) -> Option<usize> {
        self.properties.iter().position(|p| p.name == name)
    }

    pub fn parameter(&self, name: &str) -> Option<&ParameterDef> {
        self.parameters.iter().find(|p| p.name == name)
    }

    /// Ordered property names, keys first.
    pub fn schema(&self) -> Vec<&'static str> {
        self.properties.iter().map(|p| p.name).collect()
    }

    /// Script path serving this class, relative to the agent root.
    pub fn script_path(&self) -> String {
        format!("/survol/sources_types/enumerate_{}.py", self.name)
    }
}

impl PartialEq for EntityClass {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for EntityClass {}

/// Typed scalar value of one property.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    Integer(i64),
    Unsigned(u64),
    Float(f64),
    Boolean(bool),
    String(String),
    Timestamp(DateTime<Utc>),
    Reference(Moniker),
}

impl PropertyValue {
    /// Lexical form used in literals and moniker values.
    pub fn lexical_form(&self) -> String {
        match self {
            PropertyValue::Integer(v) => v.to_string(),
            PropertyValue::Unsigned(v) => v.to_string(),
            PropertyValue::Float(v) => format_double(*v),
            PropertyValue::Boolean(v) => v.to_string(),
            PropertyValue::String(v) => v.clone(),
            PropertyValue::Timestamp(v) => v.to_rfc3339_opts(SecondsFormat::Secs, true),
            PropertyValue::Reference(m) => m.subject_uri(),
        }
    }

    /// XSD datatype IRI for literal values; `None` for references.
    pub fn datatype(&self) -> Option<&'static str> {
        match self {
            PropertyValue::Integer(_) | PropertyValue::Unsigned(_) => Some(XSD_INTEGER),
            PropertyValue::Float(_) => Some(XSD_DOUBLE),
            PropertyValue::Boolean(_) => Some(XSD_BOOLEAN),
            PropertyValue::String(_) => Some(XSD_STRING),
            PropertyValue::Timestamp(_) => Some(XSD_DATE_TIME),
            PropertyValue::Reference(_) => None,
        }
    }

    /// Whether the value can be stored in a property declared as `kind`.
    pub fn fits(&self, kind: ValueKind) -> bool {
        match (self, kind) {
            (PropertyValue::Integer(_), ValueKind::Integer) => true,
            (PropertyValue::Unsigned(_), ValueKind::Unsigned | ValueKind::Integer) => true,
            (PropertyValue::Float(_), ValueKind::Float) => true,
            (PropertyValue::Boolean(_), ValueKind::Boolean) => true,
            (PropertyValue::String(_), ValueKind::String) => true,
            (PropertyValue::Timestamp(_), ValueKind::Timestamp) => true,
            (PropertyValue::Reference(m), ValueKind::Reference(class)) => m.class() == class,
            _ => false,
        }
    }
}

fn format_double(v: f64) -> String {
    if v.is_nan() {
        "NaN".to_string()
    } else if v.is_infinite() {
        if v > 0.0 { "INF" } else { "-INF" }.to_string()
    } else {
        // Display for f64 is the shortest text that parses back to the same value.
        let text = v.to_string();
        if text.contains('.') || text.contains('e') {
            text
        } else {
            format!("{}.0", text)
        }
    }
}

impl From<i64> for PropertyValue {
    fn from(v: i64) -> Self {
        PropertyValue::Integer(v)
    }
}

impl From<u32> for PropertyValue {
    fn from(v: u32) -> Self {
        PropertyValue::Unsigned(v as u64)
    }
}

impl From<u64> for PropertyValue {
    fn from(v: u64) -> Self {
        PropertyValue::Unsigned(v)
    }
}

impl From<f64> for PropertyValue {
    fn from(v: f64) -> Self {
        PropertyValue::Float(v)
    }
}

impl From<bool> for PropertyValue {
    fn from(v: bool) -> Self {
        PropertyValue::Boolean(v)
    }
}

impl From<String> for PropertyValue {
    fn from(v: String) -> Self {
        PropertyValue::String(v)
    }
}

impl From<&str> for PropertyValue {
    fn from(v: &str) -> Self {
        PropertyValue::String(v.to_string())
    }
}

impl From<DateTime<Utc>> for PropertyValue {
    fn from(v: DateTime<Utc>) -> Self {
        PropertyValue::Timestamp(v)
    }
}

impl From<Moniker> for PropertyValue {
    fn from(v: Moniker) -> Self {
        PropertyValue::Reference(v)
    }
}

/// One resource observed during one enumeration.
///
/// Values are slotted by schema position, so iteration always follows the
/// declared order whatever order the enumerator filled them in.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityInstance {
    class: &'static EntityClass,
    moniker: Moniker,
    values: Vec<Option<PropertyValue>>,
}

impl EntityInstance {
    /// Create an instance from its identifier values, given in key order.
    pub fn new(class: &'static EntityClass, keys: Vec<PropertyValue>) -> Result<Self> {
        if keys.len() != class.keys.len() {
            return Err(SurvolError::enumeration(
                class.name,
                format!("expected {} key values, got {}", class.keys.len(), keys.len()),
            ));
        }

        let mut values = vec![None; class.properties.len()];
        let mut pairs = Vec::with_capacity(keys.len());
        for (name, value) in class.keys.iter().zip(keys) {
            let index = class.property_index(name).ok_or_else(|| {
                SurvolError::enumeration(class.name, format!("key {} is not declared", name))
            })?;
            pairs.push((name.to_string(), value.lexical_form()));
            values[index] = Some(value);
        }

        Ok(Self {
            class,
            moniker: Moniker::new(class.name, pairs),
            values,
        })
    }

    pub fn class(&self) -> &'static EntityClass {
        self.class
    }

    pub fn moniker(&self) -> &Moniker {
        &self.moniker
    }

    pub fn subject_uri(&self) -> String {
        self.moniker.subject_uri()
    }

    /// Store a property value. Undeclared names and mistyped values are dropped.
    pub fn set(&mut self, name: &str, value: impl Into<PropertyValue>) -> &mut Self {
        let value = value.into();
        match self.class.property_index(name) {
            Some(_) if self.class.keys.contains(&name) => {
                warn!("Ignoring attempt to overwrite key {} of {}", name, self.moniker);
            }
            Some(index) => {
                if value.fits(self.class.properties[index].kind) {
                    self.values[index] = Some(value);
                } else {
                    warn!("Value {:?} does not fit {}.{}", value, self.class.name, name);
                }
            }
            None => warn!("{} declares no property {}", self.class.name, name),
        }
        self
    }

    /// Store the value when present, otherwise record the property as unavailable.
    pub fn set_opt<V: Into<PropertyValue>>(&mut self, name: &str, value: Option<V>) -> &mut Self {
        match value {
            Some(v) => self.set(name, v),
            None => self.omit(name),
        }
    }

    /// Leave a property out because the platform cannot supply it.
    pub fn omit(&mut self, name: &str) -> &mut Self {
        let err = SurvolError::UnsupportedOnPlatform {
            class: self.class.name.to_string(),
            property: name.to_string(),
        };
        debug!("{} ({})", err, self.moniker);
        self
    }

    pub fn get(&self, name: &str) -> Option<&PropertyValue> {
        self.class
            .property_index(name)
            .and_then(|i| self.values[i].as_ref())
    }

    /// Present properties in declared order, keys included.
    pub fn properties(&self) -> impl Iterator<Item = (&'static str, &PropertyValue)> + '_ {
        self.class
            .properties
            .iter()
            .zip(self.values.iter())
            .filter_map(|(def, value)| value.as_ref().map(|v| (def.name, v)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classes::{CIM_LOGICAL_DISK, CIM_PROCESS, USER};
    use chrono::TimeZone;

    #[test]
    fn test_lexical_forms() {
        assert_eq!(PropertyValue::Integer(-42).lexical_form(), "-42");
        assert_eq!(PropertyValue::Float(2.0).lexical_form(), "2.0");
        assert_eq!(PropertyValue::Float(0.1).lexical_form(), "0.1");
        assert_eq!(PropertyValue::Float(f64::INFINITY).lexical_form(), "INF");
        assert_eq!(PropertyValue::Boolean(true).lexical_form(), "true");

        let ts = Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 5).unwrap();
        assert_eq!(PropertyValue::Timestamp(ts).lexical_form(), "2024-03-01T12:30:05Z");
    }

    #[test]
    fn test_datatypes() {
        assert_eq!(PropertyValue::Unsigned(1).datatype(), Some(XSD_INTEGER));
        assert_eq!(PropertyValue::from("x").datatype(), Some(XSD_STRING));
        let m = Moniker::new("user", vec![("Name".into(), "root".into())]);
        assert_eq!(PropertyValue::Reference(m).datatype(), None);
    }

    #[test]
    fn test_instance_keeps_declared_order() {
        let mut process = EntityInstance::new(&CIM_PROCESS, vec![PropertyValue::from(42u32)]).unwrap();
        process.set("WorkingSetSize", 1024u64);
        process.set("Name", "bash");

        let names: Vec<_> = process.properties().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["Handle", "Name", "WorkingSetSize"]);
        assert_eq!(process.moniker().to_string(), "CIM_Process.Handle=42");
    }

    #[test]
    fn test_instance_rejects_undeclared_and_mistyped() {
        let mut user = EntityInstance::new(&USER, vec!["alice".into()]).unwrap();
        user.set("Shell", "/bin/sh");
        user.set("UserId", "not a number");
        user.set_opt::<u32>("GroupId", None);
        assert_eq!(user.properties().count(), 1);
    }

    #[test]
    fn test_key_count_checked() {
        assert!(EntityInstance::new(&CIM_LOGICAL_DISK, vec![]).is_err());
    }
}
