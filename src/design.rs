// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Huang Rui <vowstar@gmail.com>

//! The typed, placed design model detailed routing operates on, and the
//! conversion that builds it from a parsed `Def`/`Lef` pair.
//!
//! `original_source` has no single analogue of this module: the C++ side
//! reads LEF/DEF through `defrReader`/`lefrReader` callbacks directly into
//! `Process` member state. This crate instead keeps the teacher's `Def`/
//! `Lef` parse trees as an intermediate stage and folds them here into one
//! arena-addressed model, per `spec.md` §9's arena/index-addressing
//! direction: pins and nets reference each other by `PinId`/`NetId`, never by
//! name or pointer, once this conversion completes.

use std::collections::HashMap;

use crate::error::{Result, RoutingError};
use crate::geom::Rect;
use crate::grid::{AxisGrid, TrackGrid};
use crate::metal::{Metal, Orientation, PinUse};

use crate::def::{Def, DefComponent};
use crate::lef::{Lef, LefMacro};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PinId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NetId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentId(pub usize);

#[derive(Debug, Clone)]
pub struct Port {
    pub metal: Metal,
    pub rect: Rect,
}

#[derive(Debug, Clone)]
pub struct Pin {
    pub name: String,
    pub component: Option<ComponentId>,
    pub net: Option<NetId>,
    pub use_kind: PinUse,
    pub ports: Vec<Port>,
}

impl Pin {
    pub fn is_top_level(&self) -> bool {
        self.component.is_none()
    }

    /// Bounding box across all of this pin's ports, used by the access-point
    /// grid to decide CROSS vs INNER pin classification.
    pub fn bbox(&self) -> Option<Rect> {
        self.ports
            .iter()
            .map(|p| p.rect)
            .reduce(|a, b| a.union(&b))
    }
}

#[derive(Debug, Clone)]
pub struct Component {
    pub name: String,
    pub macro_name: String,
    pub origin: (f64, f64),
    pub orientation: Orientation,
    pub bbox: Rect,
    pub obstacles: Vec<Port>,
    pub pins: Vec<PinId>,
}

#[derive(Debug, Clone)]
pub struct Net {
    pub name: String,
    pub pins: Vec<PinId>,
}

#[derive(Debug, Clone, Default)]
pub struct Design {
    pub die_area: Rect,
    pub gcell_grid_x: Option<AxisGrid>,
    pub gcell_grid_y: Option<AxisGrid>,
    pub tracks: TrackGrid,
    pub components: Vec<Component>,
    pub pins: Vec<Pin>,
    pub nets: Vec<Net>,
}

impl Design {
    pub fn pin(&self, id: PinId) -> &Pin {
        &self.pins[id.0]
    }

    pub fn net(&self, id: NetId) -> &Net {
        &self.nets[id.0]
    }

    pub fn component(&self, id: ComponentId) -> &Component {
        &self.components[id.0]
    }
}

/// Sentinel instance name DEF uses for top-level PIN connections inside a
/// NET's connection list, e.g. `( PIN clk )`.
const TOP_LEVEL_INSTANCE: &str = "PIN";

/// Build the placed, arena-addressed design from a parsed DEF/LEF pair.
pub fn build_design(def: &Def, lef: &Lef) -> Result<Design> {
    let macros_by_name: HashMap<&str, &LefMacro> =
        lef.macros.iter().map(|m| (m.name.as_str(), m)).collect();

    let mut design = Design {
        die_area: die_area_rect(def),
        gcell_grid_x: gcell_axis(&def.g_cell_grid_x),
        gcell_grid_y: gcell_axis(&def.g_cell_grid_y),
        tracks: build_track_grid(def),
        ..Design::default()
    };

    let mut top_pin_by_name: HashMap<String, PinId> = HashMap::new();
    for pin in &def.pins {
        let id = PinId(design.pins.len());
        let use_kind = PinUse::parse(&pin.use_type);
        let ports = pin
            .rects
            .iter()
            .filter_map(|r| Metal::parse(&r.layer).map(|m| (m, r)))
            .map(|(metal, r)| Port {
                metal,
                rect: Rect::new(r.xl, r.yl, r.xh, r.yh),
            })
            .chain(pin.ports.iter().flat_map(|port| {
                port.rects.iter().filter_map(|r| {
                    Metal::parse(&r.layer).map(|metal| Port {
                        metal,
                        rect: Rect::new(r.xl, r.yl, r.xh, r.yh),
                    })
                })
            }))
            .collect();
        design.pins.push(Pin {
            name: pin.name.clone(),
            component: None,
            net: None,
            use_kind,
            ports,
        });
        top_pin_by_name.insert(pin.name.clone(), id);
    }

    let mut component_pin_by_key: HashMap<(String, String), PinId> = HashMap::new();
    for comp in &def.components {
        let macro_def = macros_by_name.get(comp.macro_name.as_str()).ok_or_else(|| {
            RoutingError::InputMalformed(format!(
                "component {} references unknown macro {}",
                comp.name, comp.macro_name
            ))
        })?;

        let comp_id = ComponentId(design.components.len());
        let (origin, orientation) = component_placement(comp);
        let size = (macro_def.size_x, macro_def.size_y);
        let bbox = placed_rect(Rect::new(0.0, 0.0, size.0, size.1), origin, orientation, size);

        let mut pin_ids = Vec::with_capacity(macro_def.pins.len());
        for lef_pin in &macro_def.pins {
            let ports = lef_pin
                .ports
                .iter()
                .flat_map(|port| port.rects.iter())
                .filter_map(|r| Metal::parse(&r.layer).map(|m| (m, r)))
                .map(|(metal, r)| Port {
                    metal,
                    rect: placed_rect(Rect::new(r.xl, r.yl, r.xh, r.yh), origin, orientation, size),
                })
                .collect();

            let pin_id = PinId(design.pins.len());
            design.pins.push(Pin {
                name: lef_pin.name.clone(),
                component: Some(comp_id),
                net: None,
                use_kind: PinUse::parse(&lef_pin.use_type),
                ports,
            });
            component_pin_by_key.insert((comp.name.clone(), lef_pin.name.clone()), pin_id);
            pin_ids.push(pin_id);
        }

        let obstacles = macro_def
            .obs
            .iter()
            .flat_map(|obs| obs.rects.iter())
            .filter_map(|r| Metal::parse(&r.layer).map(|m| (m, r)))
            .map(|(metal, r)| Port {
                metal,
                rect: placed_rect(Rect::new(r.xl, r.yl, r.xh, r.yh), origin, orientation, size),
            })
            .collect();

        design.components.push(Component {
            name: comp.name.clone(),
            macro_name: comp.macro_name.clone(),
            origin,
            orientation,
            bbox,
            obstacles,
            pins: pin_ids,
        });
    }

    for net in &def.nets {
        let net_id = NetId(design.nets.len());
        let mut pin_ids = Vec::new();
        for (instance, pin_name) in net.instances.iter().zip(net.instance_pins.iter()) {
            let resolved = if instance == TOP_LEVEL_INSTANCE {
                top_pin_by_name.get(pin_name).copied()
            } else {
                component_pin_by_key
                    .get(&(instance.clone(), pin_name.clone()))
                    .copied()
            };
            match resolved {
                Some(id) => {
                    design.pins[id.0].net = Some(net_id);
                    pin_ids.push(id);
                }
                None => {
                    crate::logging::log_warn!(
                        "net {} references unresolved pin {}/{}",
                        net.name,
                        instance,
                        pin_name
                    );
                }
            }
        }
        design.nets.push(Net {
            name: net.name.clone(),
            pins: pin_ids,
        });
    }

    Ok(design)
}

fn die_area_rect(def: &Def) -> Rect {
    let xs = def.die_area_points.iter().map(|p| p.0);
    let ys = def.die_area_points.iter().map(|p| p.1);
    let xl = xs.clone().fold(f64::INFINITY, f64::min);
    let xh = xs.fold(f64::NEG_INFINITY, f64::max);
    let yl = ys.clone().fold(f64::INFINITY, f64::min);
    let yh = ys.fold(f64::NEG_INFINITY, f64::max);
    if xl.is_finite() && yl.is_finite() {
        Rect::new(xl, yl, xh, yh)
    } else {
        Rect::new(0.0, 0.0, 0.0, 0.0)
    }
}

fn gcell_axis(grids: &[crate::def::DefGCellGrid]) -> Option<AxisGrid> {
    grids
        .iter()
        .map(|g| AxisGrid::new(g.offset, g.step, g.count))
        .reduce(|a, b| if b.count > a.count { b } else { a })
}

fn build_track_grid(def: &Def) -> TrackGrid {
    let mut tg = TrackGrid::new();
    for t in &def.tracks_x {
        if let Some(metal) = Metal::parse(&t.layer) {
            tg.vertical
                .insert(metal, AxisGrid::new(t.offset, t.step, t.num.max(0) as usize));
        }
    }
    for t in &def.tracks_y {
        if let Some(metal) = Metal::parse(&t.layer) {
            tg.horizontal
                .insert(metal, AxisGrid::new(t.offset, t.step, t.num.max(0) as usize));
        }
    }
    tg.gcell_x = gcell_axis(&def.g_cell_grid_x);
    tg.gcell_y = gcell_axis(&def.g_cell_grid_y);
    tg
}

fn component_placement(comp: &DefComponent) -> ((f64, f64), Orientation) {
    match &comp.placement {
        Some(p) => (
            (p.x, p.y),
            Orientation::parse(&p.orientation).unwrap_or(Orientation::N),
        ),
        None => ((0.0, 0.0), Orientation::N),
    }
}

fn placed_rect(r: Rect, origin: (f64, f64), orientation: Orientation, size: (f64, f64)) -> Rect {
    let (lx, ly) = orientation.transform((r.xl, r.yl), size);
    let (hx, hy) = orientation.transform((r.xh, r.yh), size);
    Rect::new(lx + origin.0, ly + origin.1, hx + origin.0, hy + origin.1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::def::{DefComponent, DefGCellGrid, DefNet, DefPin, DefPlacement, DefPort, DefRect};
    use crate::lef::{LefMacro, LefObstruction, LefPin, LefPort, LefRect};

    fn sample_macro() -> LefMacro {
        LefMacro {
            name: "BUF".to_string(),
            class: "CORE".to_string(),
            foreign: String::new(),
            origin: (0.0, 0.0),
            size_x: 10.0,
            size_y: 20.0,
            symmetry: Vec::new(),
            site: String::new(),
            pins: vec![LefPin {
                name: "A".to_string(),
                direction: "INPUT".to_string(),
                use_type: "SIGNAL".to_string(),
                shape: String::new(),
                ports: vec![LefPort {
                    rects: vec![LefRect {
                        layer: "metal1".to_string(),
                        xl: 1.0,
                        yl: 1.0,
                        xh: 2.0,
                        yh: 2.0,
                    }],
                    polygons: Vec::new(),
                }],
            }],
            obs: vec![LefObstruction {
                rects: vec![LefRect {
                    layer: "metal1".to_string(),
                    xl: 0.0,
                    yl: 0.0,
                    xh: 10.0,
                    yh: 0.5,
                }],
                polygons: Vec::new(),
            }],
        }
    }

    fn sample_def() -> Def {
        Def {
            die_area_points: vec![(0.0, 0.0), (100.0, 100.0)],
            g_cell_grid_x: vec![DefGCellGrid {
                offset: 0.0,
                count: 10,
                step: 10.0,
            }],
            g_cell_grid_y: vec![DefGCellGrid {
                offset: 0.0,
                count: 10,
                step: 10.0,
            }],
            pins: vec![DefPin {
                name: "clk".to_string(),
                net: "clk".to_string(),
                use_type: "SIGNAL".to_string(),
                status: "PLACED".to_string(),
                direction: "INPUT".to_string(),
                orient: "N".to_string(),
                x: 0.0,
                y: 0.0,
                rects: vec![DefRect {
                    layer: "metal2".to_string(),
                    xl: -1.0,
                    yl: -1.0,
                    xh: 1.0,
                    yh: 1.0,
                }],
                ports: vec![DefPort { rects: Vec::new() }],
            }],
            nets: vec![DefNet {
                name: "n1".to_string(),
                connections: 2,
                pins: 0,
                use_type: "SIGNAL".to_string(),
                weight: None,
                source: String::new(),
                pattern: String::new(),
                shielded: false,
                instances: vec!["PIN".to_string(), "U1".to_string()],
                instance_pins: vec!["clk".to_string(), "A".to_string()],
                routing: 0,
            }],
            components: vec![DefComponent {
                name: "U1".to_string(),
                macro_name: "BUF".to_string(),
                placement: Some(DefPlacement {
                    placement_type: "PLACED".to_string(),
                    x: 20.0,
                    y: 20.0,
                    orientation: "N".to_string(),
                }),
                routing_halo: None,
                source: None,
                weight: None,
                eeq: None,
                generate: None,
                power: None,
                ground: None,
                properties: Vec::new(),
            }],
            rows: Vec::new(),
            tracks_x: Vec::new(),
            tracks_y: Vec::new(),
            vias: Vec::new(),
        }
    }

    #[test]
    fn resolves_top_level_and_component_pins_into_one_net() {
        let def = sample_def();
        let lef = Lef {
            macros: vec![sample_macro()],
        };
        let design = build_design(&def, &lef).expect("build_design");

        assert_eq!(design.nets.len(), 1);
        assert_eq!(design.net(NetId(0)).pins.len(), 2);
        assert_eq!(design.components.len(), 1);
        assert_eq!(design.components[0].pins.len(), 1);

        let comp_pin = design.pin(design.components[0].pins[0]);
        assert_eq!(comp_pin.name, "A");
        let port = &comp_pin.ports[0];
        assert_eq!(port.rect, Rect::new(21.0, 21.0, 22.0, 22.0));
    }

    #[test]
    fn unknown_macro_is_fatal_malformed_input() {
        let mut def = sample_def();
        def.components[0].macro_name = "MISSING".to_string();
        let lef = Lef {
            macros: vec![sample_macro()],
        };
        let err = build_design(&def, &lef).unwrap_err();
        assert!(err.is_fatal());
    }
}
