use kmod_core::value::{AttrMap, AttrValue};

use crate::errors::EffectsError;

/// 文字效果（`effects`）对象的模式层。引擎组装好 `{font: {...}}` 后交给实现者校验，
/// 校验结果即为 `effects` 属性的最终值。
pub trait EffectsValidator: Send + Sync {
    fn validate(&self, effects: AttrMap) -> Result<AttrMap, EffectsError>;
}

/// 默认模式：`font.size` 必须为两个有限数值，`font.thickness` 必须为有限数值，
/// 其余 font 字段原样保留；`font` 以外的顶层键被丢弃。
#[derive(Debug, Clone, Copy, Default)]
pub struct FontEffectsSchema;

impl EffectsValidator for FontEffectsSchema {
    fn validate(&self, mut effects: AttrMap) -> Result<AttrMap, EffectsError> {
        let mut validated = AttrMap::new();
        let Some(font) = effects.remove("font") else {
            return Ok(validated);
        };
        let AttrValue::Map(font) = font else {
            return Err(EffectsError::UnexpectedShape {
                field: "font".to_string(),
            });
        };

        if let Some(size) = font.get("size") {
            validate_size(size)?;
        }
        if let Some(thickness) = font.get("thickness") {
            validate_scalar("thickness", thickness)?;
        }

        validated.insert("font".to_string(), AttrValue::Map(font));
        Ok(validated)
    }
}

fn validate_size(size: &AttrValue) -> Result<(), EffectsError> {
    match size {
        AttrValue::Numbers(values) if values.len() == 2 => {
            if values.iter().all(|value| value.is_finite()) {
                Ok(())
            } else {
                Err(EffectsError::NotFinite {
                    field: "size".to_string(),
                })
            }
        }
        AttrValue::Numbers(values) => Err(EffectsError::SizeArity(values.len())),
        AttrValue::Number(_) => Err(EffectsError::SizeArity(1)),
        _ => Err(EffectsError::UnexpectedShape {
            field: "size".to_string(),
        }),
    }
}

fn validate_scalar(field: &str, value: &AttrValue) -> Result<(), EffectsError> {
    match value {
        AttrValue::Number(number) if number.is_finite() => Ok(()),
        AttrValue::Number(_) => Err(EffectsError::NotFinite {
            field: field.to_string(),
        }),
        _ => Err(EffectsError::UnexpectedShape {
            field: field.to_string(),
        }),
    }
}
