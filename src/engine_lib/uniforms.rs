// src/engine_lib/uniforms.rs

//! Shader uniform slots and their binding to a `ParameterSet`.

use std::cell::RefCell;
use std::rc::Rc;

use crate::engine_lib::params::{parse_hex_color, ParamValue, ParameterSet};
use crate::error::SceneError;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum UniformValue {
    Float(f32),
    Vec2([f32; 2]),
    /// Linear RGB.
    Color([f32; 3]),
}

impl UniformValue {
    /// Every slot occupies one `vec4<f32>` in the material block.
    pub fn as_vec4(&self) -> [f32; 4] {
        match self {
            UniformValue::Float(v) => [*v, 0.0, 0.0, 0.0],
            UniformValue::Vec2(v) => [v[0], v[1], 0.0, 0.0],
            UniformValue::Color(c) => [c[0], c[1], c[2], 1.0],
        }
    }

    pub fn as_float(&self) -> Option<f32> {
        match self {
            UniformValue::Float(v) => Some(*v),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct UniformSlot {
    pub name: String,
    pub value: UniformValue,
    /// Parameter this slot mirrors, if any.
    pub source: Option<String>,
}

/// Insertion-ordered uniform slots of one material.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct UniformTable {
    slots: Vec<UniformSlot>,
}

pub type SharedUniforms = Rc<RefCell<UniformTable>>;

impl UniformTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn declare(&mut self, name: impl Into<String>, value: UniformValue) -> Result<(), SceneError> {
        let name = name.into();
        if self.get(&name).is_some() {
            return Err(SceneError::configuration(format!("uniform '{}' declared twice", name)));
        }
        self.slots.push(UniformSlot { name, value, source: None });
        Ok(())
    }

    /// Overwrites a declared slot. Returns false for unknown names.
    pub fn set(&mut self, name: &str, value: UniformValue) -> bool {
        match self.slots.iter_mut().find(|slot| slot.name == name) {
            Some(slot) => {
                slot.value = value;
                true
            }
            None => false,
        }
    }

    pub fn get(&self, name: &str) -> Option<&UniformSlot> {
        self.slots.iter().find(|slot| slot.name == name)
    }

    pub fn value(&self, name: &str) -> Option<UniformValue> {
        self.get(name).map(|slot| slot.value)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn slots(&self) -> &[UniformSlot] {
        &self.slots
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Packed `vec4<f32>` per slot, table order.
    pub fn to_std140(&self) -> Vec<[f32; 4]> {
        self.slots.iter().map(|slot| slot.value.as_vec4()).collect()
    }

    pub fn into_shared(self) -> SharedUniforms {
        Rc::new(RefCell::new(self))
    }

    fn bind_source(&mut self, name: &str, parameter: &str) {
        if let Some(slot) = self.slots.iter_mut().find(|slot| slot.name == name) {
            slot.source = Some(parameter.to_string());
        }
    }
}

pub type UniformTransform = Rc<dyn Fn(&ParamValue) -> Option<UniformValue>>;

/// sRGB EOTF applied per channel.
pub fn srgb_to_linear(channel: f32) -> f32 {
    if channel <= 0.04045 {
        channel / 12.92
    } else {
        ((channel + 0.055) / 1.055).powf(2.4)
    }
}

/// `#rrggbb` (sRGB) to a linear RGB triple.
pub fn color_to_linear(value: &ParamValue) -> Option<UniformValue> {
    let [r, g, b] = parse_hex_color(value.as_color()?)?;
    let lin = |c: u8| srgb_to_linear(c as f32 / 255.0);
    Some(UniformValue::Color([lin(r), lin(g), lin(b)]))
}

pub fn scalar(value: &ParamValue) -> Option<UniformValue> {
    value.as_scalar().map(UniformValue::Float)
}

fn identity(value: &ParamValue) -> Option<UniformValue> {
    match value {
        ParamValue::Color(_) => color_to_linear(value),
        _ => scalar(value),
    }
}

#[derive(Clone)]
pub struct Binding {
    pub parameter: String,
    pub uniform: String,
    pub transform: Option<UniformTransform>,
}

impl Binding {
    pub fn new(parameter: impl Into<String>, uniform: impl Into<String>) -> Self {
        Self {
            parameter: parameter.into(),
            uniform: uniform.into(),
            transform: None,
        }
    }

    pub fn with_transform(
        mut self,
        transform: impl Fn(&ParamValue) -> Option<UniformValue> + 'static,
    ) -> Self {
        self.transform = Some(Rc::new(transform));
        self
    }

    fn convert(&self, value: &ParamValue) -> Result<UniformValue, SceneError> {
        let converted = match &self.transform {
            Some(transform) => transform(value),
            None => identity(value),
        };
        converted.ok_or_else(|| {
            SceneError::configuration(format!(
                "cannot convert parameter '{}' value {} for uniform '{}'",
                self.parameter, value, self.uniform
            ))
        })
    }
}

/// Keeps parameter-driven uniform slots equal to `transform(parameter)`.
///
/// Slots are initialised on construction and rewritten synchronously from
/// the parameter observers afterwards, so an edit is visible to the very
/// next render call.
pub struct UniformBinding {
    uniforms: SharedUniforms,
    bindings: Vec<Binding>,
}

impl UniformBinding {
    pub fn new(
        params: &mut ParameterSet,
        uniforms: SharedUniforms,
        bindings: Vec<Binding>,
    ) -> Result<Self, SceneError> {
        // Validate the whole list before writing any slot.
        let mut initial = Vec::with_capacity(bindings.len());
        {
            let table = uniforms.borrow();
            for (i, binding) in bindings.iter().enumerate() {
                let slot = table.get(&binding.uniform).ok_or_else(|| {
                    SceneError::configuration(format!("binding targets undeclared uniform '{}'", binding.uniform))
                })?;
                if let Some(owner) = &slot.source {
                    return Err(SceneError::configuration(format!(
                        "uniform '{}' is already bound to parameter '{}'",
                        binding.uniform, owner
                    )));
                }
                if bindings[..i].iter().any(|b| b.uniform == binding.uniform) {
                    return Err(SceneError::configuration(format!(
                        "uniform '{}' is bound to more than one parameter",
                        binding.uniform
                    )));
                }
                let current = params.value(&binding.parameter).ok_or_else(|| {
                    SceneError::configuration(format!("unknown parameter '{}'", binding.parameter))
                })?;
                initial.push(binding.convert(current)?);
            }
        }

        {
            let mut table = uniforms.borrow_mut();
            for (binding, value) in bindings.iter().zip(initial) {
                table.set(&binding.uniform, value);
                table.bind_source(&binding.uniform, &binding.parameter);
            }
        }

        for binding in &bindings {
            let target = Rc::clone(&uniforms);
            let binding_for_observer = binding.clone();
            params.subscribe(&binding.parameter, move |value| {
                match binding_for_observer.convert(value) {
                    Ok(converted) => {
                        target.borrow_mut().set(&binding_for_observer.uniform, converted);
                    }
                    Err(err) => log::warn!("{}", err),
                }
            })?;
        }

        Ok(Self { uniforms, bindings })
    }

    pub fn uniforms(&self) -> &SharedUniforms {
        &self.uniforms
    }

    pub fn bindings(&self) -> &[Binding] {
        &self.bindings
    }

    /// Uniform fed by `parameter`, if it is bound.
    pub fn uniform_for(&self, parameter: &str) -> Option<&str> {
        self.bindings
            .iter()
            .find(|b| b.parameter == parameter)
            .map(|b| b.uniform.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine_lib::params::Parameter;

    fn setup() -> (ParameterSet, SharedUniforms) {
        let mut params = ParameterSet::new();
        params.declare(Parameter::color("color", "#ffffff")).unwrap();
        params.declare(Parameter::scalar("size", 0.1).with_bounds(0.01, 1.0)).unwrap();
        params.declare(Parameter::scalar("speed", 2.0)).unwrap();

        let mut table = UniformTable::new();
        table.declare("uColor", UniformValue::Color([0.0; 3])).unwrap();
        table.declare("uSize", UniformValue::Float(0.0)).unwrap();
        table.declare("uSpeed", UniformValue::Float(0.0)).unwrap();
        table.declare("uTime", UniformValue::Float(0.0)).unwrap();
        (params, table.into_shared())
    }

    #[test]
    fn initialises_bound_slots_from_parameters() {
        let (mut params, uniforms) = setup();
        let doubled = |v: &ParamValue| v.as_scalar().map(|s| UniformValue::Float(s * 2.0));
        let _binding = UniformBinding::new(
            &mut params,
            uniforms.clone(),
            vec![
                Binding::new("color", "uColor"),
                Binding::new("size", "uSize"),
                Binding::new("speed", "uSpeed").with_transform(doubled),
            ],
        )
        .unwrap();

        let table = uniforms.borrow();
        assert_eq!(table.value("uColor"), Some(UniformValue::Color([1.0, 1.0, 1.0])));
        assert_eq!(table.value("uSize"), Some(UniformValue::Float(0.1)));
        assert_eq!(table.value("uSpeed"), Some(UniformValue::Float(4.0)));
        assert_eq!(table.get("uSize").unwrap().source.as_deref(), Some("size"));
        assert_eq!(table.get("uTime").unwrap().source, None);
    }

    #[test]
    fn parameter_edits_reach_the_table_synchronously() {
        let (mut params, uniforms) = setup();
        let _binding =
            UniformBinding::new(&mut params, uniforms.clone(), vec![Binding::new("size", "uSize")]).unwrap();

        params.set("size", ParamValue::Scalar(0.5)).unwrap();
        assert_eq!(uniforms.borrow().value("uSize"), Some(UniformValue::Float(0.5)));
    }

    #[test]
    fn rejects_double_binding_and_unknown_targets() {
        let (mut params, uniforms) = setup();
        let twice = vec![Binding::new("size", "uSize"), Binding::new("speed", "uSize")];
        assert!(UniformBinding::new(&mut params, uniforms.clone(), twice).is_err());

        let unknown = vec![Binding::new("size", "uMissing")];
        assert!(UniformBinding::new(&mut params, uniforms, unknown).is_err());
    }

    #[test]
    fn slot_bound_by_an_earlier_binding_stays_with_its_owner() {
        let (mut params, uniforms) = setup();
        let _first =
            UniformBinding::new(&mut params, uniforms.clone(), vec![Binding::new("size", "uSize")]).unwrap();

        let err = UniformBinding::new(&mut params, uniforms.clone(), vec![Binding::new("speed", "uSize")])
            .err()
            .unwrap();
        assert!(err.is_configuration());

        params.set("speed", ParamValue::Scalar(9.0)).unwrap();
        let table = uniforms.borrow();
        assert_eq!(table.value("uSize"), Some(UniformValue::Float(0.1)));
        assert_eq!(table.get("uSize").unwrap().source.as_deref(), Some("size"));
    }

    #[test]
    fn failed_binding_list_leaves_the_table_untouched() {
        let (mut params, uniforms) = setup();
        let bindings = vec![Binding::new("size", "uSize"), Binding::new("missing", "uSpeed")];
        assert!(UniformBinding::new(&mut params, uniforms.clone(), bindings).is_err());

        {
            let table = uniforms.borrow();
            assert_eq!(table.value("uSize"), Some(UniformValue::Float(0.0)));
            assert_eq!(table.get("uSize").unwrap().source, None);
        }

        params.set("size", ParamValue::Scalar(0.7)).unwrap();
        assert_eq!(uniforms.borrow().value("uSize"), Some(UniformValue::Float(0.0)));
    }

    #[test]
    fn linearises_srgb_colors() {
        let value = ParamValue::Color("#808080".into());
        let UniformValue::Color([r, g, b]) = color_to_linear(&value).unwrap() else {
            panic!("expected a color");
        };
        assert!((r - 0.2158605).abs() < 1e-5);
        assert_eq!(r, g);
        assert_eq!(g, b);
    }
}
