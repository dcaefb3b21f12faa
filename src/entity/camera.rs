//! Camera and lens reference entities, resolved first-or-create on
//! their normalized (make, model) pair.

/// Row id of the unknown camera/lens sentinel seeded by the schema.
pub const UNKNOWN_ID: i64 = 1;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Camera {
    pub id: i64,
    pub slug: String,
    pub make: String,
    pub model: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Lens {
    pub id: i64,
    pub slug: String,
    pub make: String,
    pub model: String,
}

/// Normalize a vendor string: trims noise and strips the make when the
/// model repeats it ("Canon" + "Canon EOS 80D" keeps model "EOS 80D").
fn normalize(make: &str, model: &str) -> (String, String) {
    let make = make.trim().to_string();
    let mut model = model.trim().to_string();

    if !make.is_empty() {
        if let Some(rest) = model.strip_prefix(&make) {
            let rest = rest.trim_start();
            if !rest.is_empty() {
                model = rest.to_string();
            }
        }
    }

    (make, model)
}

fn slug(make: &str, model: &str) -> String {
    let joined = format!("{make} {model}");
    let mut out = String::with_capacity(joined.len());
    for c in joined.trim().chars() {
        if c.is_alphanumeric() {
            out.extend(c.to_lowercase());
        } else if !out.ends_with('-') && !out.is_empty() {
            out.push('-');
        }
    }
    out.trim_end_matches('-').to_string()
}

impl Camera {
    pub fn new(make: &str, model: &str) -> Option<Camera> {
        let (make, model) = normalize(make, model);
        if model.is_empty() {
            return None;
        }

        Some(Camera {
            id: 0,
            slug: slug(&make, &model),
            make,
            model,
        })
    }
}

impl Lens {
    pub fn new(make: &str, model: &str) -> Option<Lens> {
        let (make, model) = normalize(make, model);
        if model.is_empty() {
            return None;
        }

        Some(Lens {
            id: 0,
            slug: slug(&make, &model),
            make,
            model,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_strips_repeated_make() {
        let camera = Camera::new("Canon", "Canon EOS 80D").unwrap();
        assert_eq!(camera.make, "Canon");
        assert_eq!(camera.model, "EOS 80D");
        assert_eq!(camera.slug, "canon-eos-80d");
    }

    #[test]
    fn test_empty_model_yields_none() {
        assert!(Camera::new("Canon", "").is_none());
        assert!(Lens::new("", "  ").is_none());
    }
}
