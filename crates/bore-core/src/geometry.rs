use serde::{Deserialize, Serialize};

/// Length unit of an instrument description. The engine works in
/// metres; callers normalize once with [`InstrumentGeometry::normalized`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LengthUnit {
    Millimetres,
    Centimetres,
    Metres,
    Inches,
}

impl LengthUnit {
    pub fn to_metres(self) -> f64 {
        match self {
            LengthUnit::Millimetres => 1e-3,
            LengthUnit::Centimetres => 1e-2,
            LengthUnit::Metres => 1.0,
            LengthUnit::Inches => 0.0254,
        }
    }
}

/// One point of the bore profile: axial position and bore diameter,
/// measured from the top of the instrument.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BorePoint {
    pub position: f64,
    pub diameter: f64,
}

/// A tonehole. `bore_diameter` overrides the diameter interpolated from
/// the bore profile when present; `key` marks a hole closed by a
/// mechanical key rather than a finger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hole {
    pub position: f64,
    pub diameter: f64,
    /// Chimney length (hole wall height).
    pub height: f64,
    #[serde(default)]
    pub bore_diameter: Option<f64>,
    #[serde(default)]
    pub key: bool,
}

/// Fipple (recorder/whistle) window geometry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fipple {
    pub window_length: f64,
    pub window_width: f64,
    pub window_height: f64,
    /// Empirical scaling of the window's effective length, used for
    /// per-instrument-family calibration.
    #[serde(default)]
    pub fipple_factor: Option<f64>,
}

/// Embouchure hole (transverse flute) geometry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Embouchure {
    pub hole_length: f64,
    pub hole_width: f64,
    pub hole_height: f64,
}

/// The mouthpiece. Exactly one of `fipple`/`embouchure` selects a
/// flow-node (flute-like) driver; neither selects the generic
/// pressure-node (reed-like) driver. Populating both is a
/// configuration error, caught at instrument construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Mouthpiece {
    pub position: f64,
    #[serde(default)]
    pub bore_diameter: Option<f64>,
    #[serde(default)]
    pub fipple: Option<Fipple>,
    #[serde(default)]
    pub embouchure: Option<Embouchure>,
}

/// The far end of the bore.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Termination {
    #[serde(default)]
    pub bore_diameter: Option<f64>,
    pub flange_diameter: f64,
}

/// A target note for a fingering.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Note {
    pub name: String,
    pub frequency: f64,
}

/// One fingering: per-hole open flags ordered mouthpiece → termination,
/// an optional open-end flag (default open), and an optional target note.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fingering {
    pub open_holes: Vec<bool>,
    #[serde(default)]
    pub open_end: Option<bool>,
    #[serde(default)]
    pub note: Option<Note>,
}

impl Fingering {
    pub fn new(open_holes: Vec<bool>) -> Self {
        Self {
            open_holes,
            open_end: None,
            note: None,
        }
    }

    /// All holes open.
    pub fn all_open(num_holes: usize) -> Self {
        Self::new(vec![true; num_holes])
    }

    /// All holes closed.
    pub fn all_closed(num_holes: usize) -> Self {
        Self::new(vec![false; num_holes])
    }

    pub fn is_end_open(&self) -> bool {
        self.open_end.unwrap_or(true)
    }
}

/// The raw geometry of an instrument, in one consistent length unit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstrumentGeometry {
    pub name: String,
    pub bore_points: Vec<BorePoint>,
    pub holes: Vec<Hole>,
    pub mouthpiece: Mouthpiece,
    pub termination: Termination,
}

impl InstrumentGeometry {
    /// Rescale every length from `unit` to metres.
    pub fn normalized(mut self, unit: LengthUnit) -> Self {
        let s = unit.to_metres();
        if s == 1.0 {
            return self;
        }
        for bp in &mut self.bore_points {
            bp.position *= s;
            bp.diameter *= s;
        }
        for hole in &mut self.holes {
            hole.position *= s;
            hole.diameter *= s;
            hole.height *= s;
            if let Some(d) = &mut hole.bore_diameter {
                *d *= s;
            }
        }
        self.mouthpiece.position *= s;
        if let Some(d) = &mut self.mouthpiece.bore_diameter {
            *d *= s;
        }
        if let Some(fipple) = &mut self.mouthpiece.fipple {
            fipple.window_length *= s;
            fipple.window_width *= s;
            fipple.window_height *= s;
        }
        if let Some(emb) = &mut self.mouthpiece.embouchure {
            emb.hole_length *= s;
            emb.hole_width *= s;
            emb.hole_height *= s;
        }
        if let Some(d) = &mut self.termination.bore_diameter {
            *d *= s;
        }
        self.termination.flange_diameter *= s;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tin_whistle_mm() -> InstrumentGeometry {
        InstrumentGeometry {
            name: "test whistle".into(),
            bore_points: vec![
                BorePoint { position: 0.0, diameter: 13.0 },
                BorePoint { position: 300.0, diameter: 13.0 },
            ],
            holes: vec![Hole {
                position: 200.0,
                diameter: 6.0,
                height: 2.0,
                bore_diameter: None,
                key: false,
            }],
            mouthpiece: Mouthpiece {
                position: 20.0,
                bore_diameter: None,
                fipple: Some(Fipple {
                    window_length: 5.0,
                    window_width: 8.0,
                    window_height: 3.0,
                    fipple_factor: None,
                }),
                embouchure: None,
            },
            termination: Termination {
                bore_diameter: None,
                flange_diameter: 15.0,
            },
        }
    }

    #[test]
    fn test_normalized_scales_all_lengths() {
        let geo = tin_whistle_mm().normalized(LengthUnit::Millimetres);
        assert!((geo.bore_points[1].position - 0.3).abs() < 1e-12);
        assert!((geo.holes[0].diameter - 6e-3).abs() < 1e-12);
        assert!((geo.mouthpiece.position - 0.02).abs() < 1e-12);
        let fipple = geo.mouthpiece.fipple.as_ref().unwrap();
        assert!((fipple.window_width - 8e-3).abs() < 1e-12);
        assert!((geo.termination.flange_diameter - 15e-3).abs() < 1e-12);
    }

    #[test]
    fn test_normalized_metres_is_identity() {
        let geo = tin_whistle_mm();
        let out = geo.clone().normalized(LengthUnit::Metres);
        assert_eq!(out.bore_points[1].position, geo.bore_points[1].position);
    }

    #[test]
    fn test_fingering_defaults() {
        let f = Fingering::all_closed(6);
        assert_eq!(f.open_holes.len(), 6);
        assert!(f.open_holes.iter().all(|open| !open));
        assert!(f.is_end_open(), "end defaults to open");
    }

    #[test]
    fn test_fingering_serde_roundtrip() {
        let f = Fingering {
            open_holes: vec![true, false, true],
            open_end: Some(false),
            note: Some(Note { name: "D5".into(), frequency: 587.33 }),
        };
        let json = serde_json::to_string(&f).unwrap();
        let back: Fingering = serde_json::from_str(&json).unwrap();
        assert_eq!(back.open_holes, f.open_holes);
        assert_eq!(back.open_end, Some(false));
        assert_eq!(back.note.unwrap().name, "D5");
    }
}
