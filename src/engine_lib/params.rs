// src/engine_lib/params.rs

//! Named, bounded tunables with synchronous change notification.
//!
//! A `ParameterSet` is declared once when a demo is built. Afterwards values
//! only change through `set`, which validates the value and then runs every
//! observer registered for that parameter before returning.
//!
//! Observers must not call `set` themselves: the set is borrowed mutably for
//! the whole notification, and nested propagation order is unspecified.

use std::collections::HashMap;
use std::fmt;

use crate::error::SceneError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParamKind {
    Scalar,
    Color,
    Integer,
}

#[derive(Clone, Debug, PartialEq)]
pub enum ParamValue {
    Scalar(f32),
    /// `#rrggbb`, sRGB encoded.
    Color(String),
    Integer(i64),
}

impl ParamValue {
    pub fn kind(&self) -> ParamKind {
        match self {
            ParamValue::Scalar(_) => ParamKind::Scalar,
            ParamValue::Color(_) => ParamKind::Color,
            ParamValue::Integer(_) => ParamKind::Integer,
        }
    }

    pub fn as_scalar(&self) -> Option<f32> {
        match self {
            ParamValue::Scalar(v) => Some(*v),
            ParamValue::Integer(v) => Some(*v as f32),
            ParamValue::Color(_) => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            ParamValue::Integer(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_color(&self) -> Option<&str> {
        match self {
            ParamValue::Color(hex) => Some(hex),
            _ => None,
        }
    }

    fn numeric(&self) -> Option<f64> {
        match self {
            ParamValue::Scalar(v) => Some(*v as f64),
            ParamValue::Integer(v) => Some(*v as f64),
            ParamValue::Color(_) => None,
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Scalar(v) => write!(f, "{}", v),
            ParamValue::Color(hex) => write!(f, "{}", hex),
            ParamValue::Integer(v) => write!(f, "{}", v),
        }
    }
}

/// Parses `#rrggbb` (leading `#` optional) into sRGB bytes.
pub fn parse_hex_color(hex: &str) -> Option<[u8; 3]> {
    let digits = hex.strip_prefix('#').unwrap_or(hex);
    if digits.len() != 6 || !digits.is_ascii() {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(&digits[i..i + 2], 16).ok();
    Some([channel(0)?, channel(2)?, channel(4)?])
}

pub fn format_hex_color(rgb: [u8; 3]) -> String {
    format!("#{:02x}{:02x}{:02x}", rgb[0], rgb[1], rgb[2])
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Bounds {
    pub min: f64,
    pub max: f64,
    pub step: Option<f64>,
}

impl Bounds {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max, step: None }
    }

    pub fn with_step(mut self, step: f64) -> Self {
        self.step = Some(step);
        self
    }

    /// Compared at `f32` precision, the precision scalar values are stored in.
    pub fn contains(&self, value: f64) -> bool {
        let v = value as f32;
        v >= self.min as f32 && v <= self.max as f32
    }
}

#[derive(Clone, Debug)]
pub struct Parameter {
    name: String,
    value: ParamValue,
    bounds: Option<Bounds>,
    label: Option<String>,
    folder: Option<String>,
}

impl Parameter {
    pub fn scalar(name: impl Into<String>, value: f32) -> Self {
        Self::new(name, ParamValue::Scalar(value))
    }

    pub fn integer(name: impl Into<String>, value: i64) -> Self {
        Self::new(name, ParamValue::Integer(value))
    }

    pub fn color(name: impl Into<String>, hex: impl Into<String>) -> Self {
        Self::new(name, ParamValue::Color(hex.into()))
    }

    fn new(name: impl Into<String>, value: ParamValue) -> Self {
        Self {
            name: name.into(),
            value,
            bounds: None,
            label: None,
            folder: None,
        }
    }

    pub fn with_bounds(mut self, min: f64, max: f64) -> Self {
        self.bounds = Some(Bounds::new(min, max));
        self
    }

    /// Sets bounds and the editing step in one go.
    pub fn with_range(mut self, min: f64, max: f64, step: f64) -> Self {
        self.bounds = Some(Bounds::new(min, max).with_step(step));
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn in_folder(mut self, folder: impl Into<String>) -> Self {
        self.folder = Some(folder.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ParamKind {
        self.value.kind()
    }

    pub fn value(&self) -> &ParamValue {
        &self.value
    }

    pub fn bounds(&self) -> Option<Bounds> {
        self.bounds
    }

    /// Display label, falling back to the name.
    pub fn label(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.name)
    }

    pub fn folder(&self) -> Option<&str> {
        self.folder.as_deref()
    }

    fn check(&self, value: &ParamValue) -> Result<(), SceneError> {
        if value.kind() != self.kind() {
            return Err(SceneError::configuration(format!(
                "parameter '{}' expects {:?}, got {:?}",
                self.name,
                self.kind(),
                value.kind()
            )));
        }
        if let ParamValue::Color(hex) = value {
            if parse_hex_color(hex).is_none() {
                return Err(SceneError::configuration(format!(
                    "parameter '{}': '{}' is not a #rrggbb color",
                    self.name, hex
                )));
            }
        }
        if let Some(v) = value.numeric() {
            if !v.is_finite() {
                return Err(SceneError::configuration(format!(
                    "parameter '{}': {} is not finite",
                    self.name, value
                )));
            }
        }
        if let (Some(bounds), Some(v)) = (self.bounds, value.numeric()) {
            if !bounds.contains(v) {
                return Err(SceneError::configuration(format!(
                    "parameter '{}': {} outside [{}, {}]",
                    self.name, value, bounds.min, bounds.max
                )));
            }
        }
        Ok(())
    }
}

pub type ParamObserver = Box<dyn FnMut(&ParamValue)>;

/// Insertion-ordered parameters plus their observers.
#[derive(Default)]
pub struct ParameterSet {
    params: Vec<Parameter>,
    index: HashMap<String, usize>,
    observers: Vec<Vec<ParamObserver>>,
}

impl ParameterSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn declare(&mut self, param: Parameter) -> Result<(), SceneError> {
        if self.index.contains_key(&param.name) {
            return Err(SceneError::configuration(format!(
                "parameter '{}' declared twice",
                param.name
            )));
        }
        if let Some(bounds) = param.bounds {
            if !(bounds.min <= bounds.max) {
                return Err(SceneError::configuration(format!(
                    "parameter '{}': min {} greater than max {}",
                    param.name, bounds.min, bounds.max
                )));
            }
            if matches!(bounds.step, Some(step) if !(step > 0.0)) {
                return Err(SceneError::configuration(format!(
                    "parameter '{}': step must be positive",
                    param.name
                )));
            }
        }
        param.check(&param.value)?;

        self.index.insert(param.name.clone(), self.params.len());
        self.params.push(param);
        self.observers.push(Vec::new());
        Ok(())
    }

    /// Validates and commits `value`, then notifies every observer of `name`
    /// exactly once, in registration order.
    pub fn set(&mut self, name: &str, value: ParamValue) -> Result<(), SceneError> {
        let idx = self.position(name)?;
        self.params[idx].check(&value)?;
        log::debug!("parameter '{}' = {}", name, value);
        self.params[idx].value = value;

        let committed = &self.params[idx].value;
        for observer in self.observers[idx].iter_mut() {
            observer(committed);
        }
        Ok(())
    }

    pub fn subscribe(
        &mut self,
        name: &str,
        observer: impl FnMut(&ParamValue) + 'static,
    ) -> Result<(), SceneError> {
        let idx = self.position(name)?;
        self.observers[idx].push(Box::new(observer));
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Parameter> {
        self.index.get(name).map(|&idx| &self.params[idx])
    }

    pub fn value(&self, name: &str) -> Option<&ParamValue> {
        self.get(name).map(Parameter::value)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Parameter> {
        self.params.iter()
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    fn position(&self, name: &str) -> Result<usize, SceneError> {
        self.index
            .get(name)
            .copied()
            .ok_or_else(|| SceneError::configuration(format!("unknown parameter '{}'", name)))
    }
}

impl fmt::Debug for ParameterSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParameterSet")
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn sample() -> ParameterSet {
        let mut set = ParameterSet::new();
        set.declare(Parameter::scalar("size", 0.1).with_range(0.01, 1.0, 0.01)).unwrap();
        set.declare(Parameter::color("color", "#e2ff0a")).unwrap();
        set.declare(Parameter::integer("count", 24).with_bounds(0.0, 500.0)).unwrap();
        set
    }

    #[test]
    fn keeps_declaration_order() {
        let set = sample();
        let names: Vec<_> = set.iter().map(Parameter::name).collect();
        assert_eq!(names, ["size", "color", "count"]);
    }

    #[test]
    fn rejects_duplicate_and_inverted_bounds() {
        let mut set = sample();
        assert!(set.declare(Parameter::scalar("size", 0.5)).unwrap_err().is_configuration());
        let inverted = Parameter::scalar("speed", 1.0).with_bounds(10.0, 1.0);
        assert!(set.declare(inverted).is_err());
        let outside = Parameter::scalar("phase", 200.0).with_bounds(1.0, 100.0);
        assert!(set.declare(outside).is_err());
        assert!(set.declare(Parameter::color("bad", "e2ff")).is_err());
    }

    #[test]
    fn rejects_out_of_range_without_notifying() {
        let mut set = sample();
        let calls = Rc::new(RefCell::new(0));
        let seen = calls.clone();
        set.subscribe("size", move |_| *seen.borrow_mut() += 1).unwrap();

        assert!(set.set("size", ParamValue::Scalar(2.0)).is_err());
        assert!(set.set("size", ParamValue::Integer(1)).is_err());
        assert!(set.set("missing", ParamValue::Scalar(0.2)).is_err());
        assert_eq!(*calls.borrow(), 0);
        assert_eq!(set.value("size"), Some(&ParamValue::Scalar(0.1)));
    }

    #[test]
    fn unbounded_scalars_still_reject_non_finite_values() {
        let mut set = sample();
        set.declare(Parameter::scalar("speed", 2.0)).unwrap();

        for bad in [f32::NAN, f32::INFINITY, f32::NEG_INFINITY] {
            let err = set.set("speed", ParamValue::Scalar(bad)).unwrap_err();
            assert!(err.is_configuration());
        }
        assert_eq!(set.value("speed"), Some(&ParamValue::Scalar(2.0)));
        assert!(set.declare(Parameter::scalar("phase", f32::NAN)).is_err());
        assert!(set.get("phase").is_none());
    }

    #[test]
    fn observers_run_once_each_in_order() {
        let mut set = sample();
        let log = Rc::new(RefCell::new(Vec::new()));
        for tag in ["first", "second"] {
            let log = log.clone();
            set.subscribe("size", move |v| log.borrow_mut().push((tag, v.clone()))).unwrap();
        }

        // Same value as the current one still fires exactly once per observer.
        set.set("size", ParamValue::Scalar(0.1)).unwrap();
        assert_eq!(
            *log.borrow(),
            vec![("first", ParamValue::Scalar(0.1)), ("second", ParamValue::Scalar(0.1))]
        );
    }

    #[test]
    fn color_values_must_be_hex() {
        let mut set = sample();
        assert!(set.set("color", ParamValue::Color("green".into())).is_err());
        set.set("color", ParamValue::Color("#00ff00".into())).unwrap();
        assert_eq!(parse_hex_color("#00ff00"), Some([0, 255, 0]));
        assert_eq!(format_hex_color([0, 255, 0]), "#00ff00");
    }
}
