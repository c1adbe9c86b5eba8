// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Huang Rui <vowstar@gmail.com>

use nom::{
    branch::alt,
    bytes::complete::{tag, take_until, take_while1},
    character::complete::{char, i32 as parse_i32, multispace0, space1},
    multi::separated_list0,
    number::complete::double,
    sequence::{delimited, preceded, terminated, tuple},
    IResult,
};

use crate::logging::{log_info, log_warn};
use super::{
    Def, DefComponent, DefGCellGrid, DefNet, DefPin, DefPlacement, DefPolygon, DefPort, DefRect,
    DefVia, DefViaLayer,
};

fn identifier(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| c.is_alphanumeric() || c == '_' || c == '.' || c == '/' || c == '-')(
        input,
    )
}

fn string_literal(input: &str) -> IResult<&str, &str> {
    alt((
        delimited(char('"'), take_until("\""), char('"')),
        identifier,
    ))(input)
}

fn parse_die_area(input: &str) -> IResult<&str, Vec<(f64, f64)>> {
    let (input, _) = multispace0(input)?;
    let (input, _) = tag("DIEAREA")(input)?;
    let (input, _) = space1(input)?;
    let (input, points) = separated_list0(
        space1,
        tuple((
            preceded(tag("("), double),
            preceded(space1, terminated(double, tag(")"))),
        )),
    )(input)?;
    let (input, _) = multispace0(input)?;
    let (input, _) = tag(";")(input)?;

    Ok((input, points))
}

fn parse_gcell_grid(input: &str) -> IResult<&str, (Vec<DefGCellGrid>, Vec<DefGCellGrid>)> {
    let (input, _) = multispace0(input)?;

    let mut gcell_x = Vec::new();
    let mut gcell_y = Vec::new();
    let mut remaining = input;

    while let Ok((rest, _)) = preceded(
        multispace0::<&str, nom::error::Error<&str>>,
        tag("GCELLGRID"),
    )(remaining)
    {
        let (rest, _) = space1(rest)?;
        let (rest, direction) = identifier(rest)?;
        let (rest, _) = space1(rest)?;
        let (rest, offset) = double(rest)?;
        let (rest, _) = space1(rest)?;
        let (rest, _) = tag("DO")(rest)?;
        let (rest, _) = space1(rest)?;
        let (rest, num) = parse_i32(rest)?;
        let (rest, _) = space1(rest)?;
        let (rest, _) = tag("STEP")(rest)?;
        let (rest, _) = space1(rest)?;
        let (rest, step) = double(rest)?;
        let (rest, _) = multispace0(rest)?;
        let (rest, _) = tag(";")(rest)?;

        let grid = DefGCellGrid {
            offset,
            count: num.max(0) as usize,
            step,
        };

        if direction.to_uppercase() == "X" {
            gcell_x.push(grid);
        } else if direction.to_uppercase() == "Y" {
            gcell_y.push(grid);
        }

        remaining = rest;
    }

    Ok((remaining, (gcell_x, gcell_y)))
}

/// Collect a `-`-delimited statement spanning one or more lines, joining them
/// on whitespace, up to and including the line carrying the terminating `;`.
/// Mirrors the DIEAREA multi-line gather below, generalized to any section.
fn collect_statement(lines: &[&str], start: usize) -> (String, usize) {
    let mut content = String::new();
    let mut idx = start;
    content.push_str(lines[idx].trim());
    while !content.contains(';') && idx + 1 < lines.len() {
        idx += 1;
        content.push(' ');
        content.push_str(lines[idx].trim());
    }
    (content, idx)
}

fn parse_components_section(lines: &[&str], start: usize) -> (Vec<DefComponent>, usize) {
    let mut components = Vec::new();
    let mut i = start;
    while i < lines.len() {
        let line = lines[i].trim();
        if line.starts_with("END COMPONENTS") {
            return (components, i);
        }
        if line.is_empty() || !line.starts_with('-') {
            i += 1;
            continue;
        }

        let (stmt, end_idx) = collect_statement(lines, i);
        i = end_idx + 1;
        let tokens: Vec<&str> = stmt.split_whitespace().collect();
        if tokens.len() < 3 {
            continue;
        }
        let name = tokens[1].to_string();
        let macro_name = tokens[2].to_string();

        let mut placement = None;
        let mut routing_halo = None;
        let mut source = None;
        let mut weight = None;
        let mut eeq = None;
        let mut generate = None;
        let mut properties = Vec::new();

        let mut j = 3;
        while j + 1 < tokens.len() {
            if tokens[j] != "+" {
                j += 1;
                continue;
            }
            match tokens[j + 1] {
                "PLACED" | "FIXED" | "COVER" | "UNPLACED" => {
                    let placement_type = tokens[j + 1].to_string();
                    if placement_type == "UNPLACED" {
                        placement = Some(DefPlacement {
                            placement_type,
                            x: 0.0,
                            y: 0.0,
                            orientation: String::new(),
                        });
                        j += 2;
                    } else if j + 6 < tokens.len() && tokens[j + 2] == "(" {
                        if let (Ok(x), Ok(y)) =
                            (tokens[j + 3].parse::<f64>(), tokens[j + 4].parse::<f64>())
                        {
                            let orientation = tokens[j + 6].to_string();
                            placement = Some(DefPlacement {
                                placement_type,
                                x,
                                y,
                                orientation,
                            });
                        }
                        j += 7;
                    } else {
                        j += 2;
                    }
                }
                "SOURCE" if j + 2 < tokens.len() => {
                    source = Some(tokens[j + 2].to_string());
                    j += 3;
                }
                "WEIGHT" if j + 2 < tokens.len() => {
                    weight = tokens[j + 2].parse::<f64>().ok();
                    j += 3;
                }
                "EEQMASTER" if j + 2 < tokens.len() => {
                    eeq = Some(tokens[j + 2].to_string());
                    j += 3;
                }
                "GENERATE" if j + 2 < tokens.len() => {
                    generate = Some(tokens[j + 2].to_string());
                    j += 3;
                }
                "HALO" if j + 5 < tokens.len() => {
                    if let (Ok(l), Ok(b), Ok(r), Ok(t)) = (
                        tokens[j + 2].parse::<f64>(),
                        tokens[j + 3].parse::<f64>(),
                        tokens[j + 4].parse::<f64>(),
                        tokens[j + 5].parse::<f64>(),
                    ) {
                        routing_halo = Some((l, b, r, t));
                    }
                    j += 6;
                }
                "PROPERTY" if j + 3 < tokens.len() => {
                    properties.push((tokens[j + 2].to_string(), tokens[j + 3].to_string()));
                    j += 4;
                }
                _ => j += 2,
            }
        }

        components.push(DefComponent {
            name,
            macro_name,
            placement,
            routing_halo,
            source,
            weight,
            eeq,
            generate,
            power: None,
            ground: None,
            properties,
        });
    }
    (components, i)
}

fn parse_pins_section(lines: &[&str], start: usize) -> (Vec<DefPin>, usize) {
    let mut pins = Vec::new();
    let mut i = start;
    while i < lines.len() {
        let line = lines[i].trim();
        if line.starts_with("END PINS") {
            return (pins, i);
        }
        if line.is_empty() || !line.starts_with('-') {
            i += 1;
            continue;
        }

        let (stmt, end_idx) = collect_statement(lines, i);
        i = end_idx + 1;
        let tokens: Vec<&str> = stmt.split_whitespace().collect();
        if tokens.len() < 2 {
            continue;
        }
        let name = tokens[1].to_string();

        let mut net = String::new();
        let mut use_type = String::new();
        let mut status = String::new();
        let mut direction = String::new();
        let mut orient = String::new();
        let mut x = 0.0f64;
        let mut y = 0.0f64;
        let mut rects: Vec<DefRect> = Vec::new();
        let mut ports: Vec<DefPort> = Vec::new();

        let mut j = 2;
        while j + 1 < tokens.len() {
            if tokens[j] != "+" {
                j += 1;
                continue;
            }
            match tokens[j + 1] {
                "NET" if j + 2 < tokens.len() => {
                    net = tokens[j + 2].to_string();
                    j += 3;
                }
                "DIRECTION" if j + 2 < tokens.len() => {
                    direction = tokens[j + 2].to_string();
                    j += 3;
                }
                "USE" if j + 2 < tokens.len() => {
                    use_type = tokens[j + 2].to_string();
                    j += 3;
                }
                "LAYER" if j + 2 < tokens.len() => {
                    let layer_name = tokens[j + 2].to_string();
                    if j + 8 < tokens.len() && tokens[j + 3] == "(" {
                        if let (Ok(xl), Ok(yl), Ok(xh), Ok(yh)) = (
                            tokens[j + 4].parse::<f64>(),
                            tokens[j + 5].parse::<f64>(),
                            tokens[j + 7].parse::<f64>(),
                            tokens[j + 8].parse::<f64>(),
                        ) {
                            rects.push(DefRect {
                                layer: layer_name,
                                xl,
                                yl,
                                xh,
                                yh,
                            });
                        }
                        j += 9;
                    } else {
                        j += 3;
                    }
                }
                "PLACED" | "FIXED" | "COVER" => {
                    status = tokens[j + 1].to_string();
                    if j + 6 < tokens.len() && tokens[j + 2] == "(" {
                        if let (Ok(px), Ok(py)) =
                            (tokens[j + 3].parse::<f64>(), tokens[j + 4].parse::<f64>())
                        {
                            x = px;
                            y = py;
                            orient = tokens[j + 6].to_string();
                        }
                        j += 7;
                    } else {
                        j += 2;
                    }
                }
                "PORT" => {
                    ports.push(DefPort {
                        rects: rects.clone(),
                    });
                    j += 2;
                }
                _ => j += 2,
            }
        }

        pins.push(DefPin {
            name,
            net,
            use_type,
            status,
            direction,
            orient,
            x,
            y,
            rects,
            ports,
        });
    }
    (pins, i)
}

fn parse_nets_section(lines: &[&str], start: usize) -> (Vec<DefNet>, usize) {
    let mut nets = Vec::new();
    let mut i = start;
    while i < lines.len() {
        let line = lines[i].trim();
        if line.starts_with("END NETS") {
            return (nets, i);
        }
        if line.is_empty() || !line.starts_with('-') {
            i += 1;
            continue;
        }

        let (stmt, end_idx) = collect_statement(lines, i);
        i = end_idx + 1;
        let tokens: Vec<&str> = stmt.split_whitespace().collect();
        if tokens.len() < 2 {
            continue;
        }
        let name = tokens[1].to_string();

        let mut instances = Vec::new();
        let mut instance_pins = Vec::new();
        let mut use_type = String::new();
        let mut weight = None;
        let mut source = String::new();
        let mut pattern = String::new();
        let mut shielded = false;

        let mut j = 2;
        while j < tokens.len() {
            if tokens[j] == "(" && j + 2 < tokens.len() {
                let comp = tokens[j + 1].to_string();
                let pin = tokens[j + 2].to_string();
                if comp != "PIN" {
                    instances.push(comp);
                }
                instance_pins.push(pin);
                j += 4;
            } else if tokens[j] == "+" && j + 1 < tokens.len() {
                match tokens[j + 1] {
                    "USE" if j + 2 < tokens.len() => {
                        use_type = tokens[j + 2].to_string();
                        j += 3;
                    }
                    "WEIGHT" if j + 2 < tokens.len() => {
                        weight = tokens[j + 2].parse::<f64>().ok();
                        j += 3;
                    }
                    "SOURCE" if j + 2 < tokens.len() => {
                        source = tokens[j + 2].to_string();
                        j += 3;
                    }
                    "PATTERN" if j + 2 < tokens.len() => {
                        pattern = tokens[j + 2].to_string();
                        j += 3;
                    }
                    "SHIELDNET" => {
                        shielded = true;
                        j += 2;
                    }
                    _ => j += 2,
                }
            } else {
                j += 1;
            }
        }

        let connections = instance_pins.len();
        let pins = instance_pins.len();
        nets.push(DefNet {
            name,
            connections,
            pins,
            use_type,
            weight,
            source,
            pattern,
            shielded,
            instances,
            instance_pins,
            routing: 0,
        });
    }
    (nets, i)
}

fn parse_def_simple(input: &str) -> IResult<&str, Def> {
    log_info!("parsing DEF input");

    let mut die_area_points = Vec::new();
    let mut g_cell_grid_x = Vec::new();
    let mut g_cell_grid_y = Vec::new();
    let mut components = Vec::new();
    let mut pins = Vec::new();
    let mut nets = Vec::new();
    let mut vias = Vec::new();

    let lines: Vec<&str> = input.lines().collect();
    let mut i = 0;

    while i < lines.len() {
        let line = lines[i].trim();
        if line.is_empty() {
            i += 1;
            continue;
        }

        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.is_empty() {
            i += 1;
            continue;
        }

        match parts[0] {
            "DIEAREA" => {
                let mut diearea_content = String::new();
                let mut line_idx = i;
                diearea_content.push_str(line);
                while !diearea_content.contains(';') && line_idx + 1 < lines.len() {
                    line_idx += 1;
                    diearea_content.push(' ');
                    diearea_content.push_str(lines[line_idx].trim());
                }
                i = line_idx;

                let content_parts: Vec<&str> = diearea_content.split_whitespace().collect();
                let mut j = 1;
                while j < content_parts.len() {
                    if content_parts[j] == "("
                        && j + 3 < content_parts.len()
                        && content_parts[j + 3] == ")"
                    {
                        if let (Ok(x), Ok(y)) = (
                            content_parts[j + 1].parse::<f64>(),
                            content_parts[j + 2].parse::<f64>(),
                        ) {
                            die_area_points.push((x, y));
                        }
                        j += 4;
                    } else if content_parts[j] == ";" {
                        break;
                    } else {
                        j += 1;
                    }
                }
            }
            "GCELLGRID" => {
                if let Ok((_, (gx, gy))) = parse_gcell_grid(&lines[i..].join("\n")) {
                    g_cell_grid_x.extend(gx);
                    g_cell_grid_y.extend(gy);
                }
                while i < lines.len() && lines[i].trim().starts_with("GCELLGRID") {
                    i += 1;
                }
                continue;
            }
            "COMPONENTS" if parts.len() > 1 => {
                if parts[1].parse::<usize>().is_ok() {
                    i += 1;
                    let (parsed, next_index) = parse_components_section(&lines, i);
                    log_info!("parsed {} components", parsed.len());
                    components.extend(parsed);
                    i = next_index;
                }
            }
            "PINS" if parts.len() > 1 => {
                if parts[1].parse::<usize>().is_ok() {
                    i += 1;
                    let (parsed, next_index) = parse_pins_section(&lines, i);
                    log_info!("parsed {} pins", parsed.len());
                    pins.extend(parsed);
                    i = next_index;
                }
            }
            "NETS" if parts.len() > 1 => {
                if parts[1].parse::<usize>().is_ok() {
                    i += 1;
                    let (parsed, next_index) = parse_nets_section(&lines, i);
                    log_info!("parsed {} nets", parsed.len());
                    nets.extend(parsed);
                    i = next_index;
                }
            }
            "VIAS" if parts.len() > 1 => {
                if parts[1].parse::<usize>().is_ok() {
                    i += 1;

                    while i < lines.len() {
                        let via_line = lines[i].trim();
                        if via_line.starts_with("END VIAS") {
                            break;
                        }

                        let via_parts: Vec<&str> = via_line.split_whitespace().collect();
                        if via_parts.len() >= 2 && via_parts[0] == "-" {
                            let via_name = via_parts[1].to_string();
                            let mut layers: Vec<DefViaLayer> = Vec::new();

                            i += 1;
                            while i < lines.len() {
                                let via_content_line = lines[i].trim();
                                if via_content_line.starts_with("END VIAS")
                                    || (via_content_line.starts_with('-')
                                        && via_content_line.len() > 1)
                                {
                                    break;
                                }

                                let content_parts: Vec<&str> =
                                    via_content_line.split_whitespace().collect();
                                if !content_parts.is_empty() && content_parts[0] == "+" {
                                    if content_parts.len() >= 2 {
                                        match content_parts[1] {
                                            "RECT" => {
                                                if content_parts.len() >= 8 {
                                                    let layer_name =
                                                        content_parts[2].to_string();
                                                    if let (Ok(xl), Ok(yl), Ok(xh), Ok(yh)) = (
                                                        content_parts[4].parse::<f64>(),
                                                        content_parts[5].parse::<f64>(),
                                                        content_parts[7].parse::<f64>(),
                                                        content_parts[8].parse::<f64>(),
                                                    ) {
                                                        let layer_index = layers
                                                            .iter()
                                                            .position(|l: &DefViaLayer| {
                                                                l.layer_name == layer_name
                                                            });

                                                        if let Some(idx) = layer_index {
                                                            layers[idx].rects.push(DefRect {
                                                                layer: layer_name.clone(),
                                                                xl,
                                                                yl,
                                                                xh,
                                                                yh,
                                                            });
                                                        } else {
                                                            let mut new_layer = DefViaLayer {
                                                                layer_name: layer_name.clone(),
                                                                mask: None,
                                                                rects: Vec::new(),
                                                                polygons: Vec::new(),
                                                            };
                                                            new_layer.rects.push(DefRect {
                                                                layer: layer_name,
                                                                xl,
                                                                yl,
                                                                xh,
                                                                yh,
                                                            });
                                                            layers.push(new_layer);
                                                        }
                                                    }
                                                }
                                            }
                                            "POLYGON" => {
                                                if content_parts.len() >= 3 {
                                                    let layer_name =
                                                        content_parts[2].to_string();
                                                    let mut mask_num: Option<i32> = None;

                                                    let mut polygon_content = String::new();
                                                    polygon_content.push_str(via_content_line);

                                                    let mut poly_i = i + 1;
                                                    while !polygon_content.contains(';')
                                                        && poly_i < lines.len()
                                                    {
                                                        let next_line = lines[poly_i].trim();
                                                        if next_line.starts_with('-')
                                                            || next_line.starts_with("END VIAS")
                                                        {
                                                            break;
                                                        }
                                                        polygon_content.push(' ');
                                                        polygon_content.push_str(next_line);
                                                        poly_i += 1;
                                                    }
                                                    i = poly_i - 1;

                                                    let poly_parts: Vec<&str> = polygon_content
                                                        .split_whitespace()
                                                        .collect();
                                                    let mut part_idx = 3;

                                                    if part_idx < poly_parts.len()
                                                        && poly_parts[part_idx] == "+"
                                                        && part_idx + 1 < poly_parts.len()
                                                        && poly_parts[part_idx + 1] == "MASK"
                                                    {
                                                        part_idx += 2;
                                                        if part_idx < poly_parts.len() {
                                                            if let Ok(mask) =
                                                                poly_parts[part_idx].parse::<i32>()
                                                            {
                                                                mask_num = Some(mask);
                                                            }
                                                            part_idx += 1;
                                                        }
                                                    }

                                                    let mut points = Vec::new();
                                                    while part_idx < poly_parts.len() {
                                                        if poly_parts[part_idx] == "("
                                                            && part_idx + 3 < poly_parts.len()
                                                            && poly_parts[part_idx + 3] == ")"
                                                        {
                                                            if let (Ok(x), Ok(y)) = (
                                                                poly_parts[part_idx + 1]
                                                                    .parse::<f64>(),
                                                                poly_parts[part_idx + 2]
                                                                    .parse::<f64>(),
                                                            ) {
                                                                points.push((x, y));
                                                                part_idx += 4;
                                                            } else {
                                                                break;
                                                            }
                                                        } else if poly_parts[part_idx] == ";" {
                                                            break;
                                                        } else {
                                                            part_idx += 1;
                                                        }
                                                    }

                                                    if !points.is_empty() {
                                                        let layer_index = layers
                                                            .iter()
                                                            .position(|l: &DefViaLayer| {
                                                                l.layer_name == layer_name
                                                            });

                                                        if let Some(idx) = layer_index {
                                                            layers[idx].polygons.push(
                                                                DefPolygon {
                                                                    points: points.clone(),
                                                                },
                                                            );
                                                            if mask_num.is_some() {
                                                                layers[idx].mask = mask_num;
                                                            }
                                                        } else {
                                                            let mut new_layer = DefViaLayer {
                                                                layer_name: layer_name.clone(),
                                                                mask: mask_num,
                                                                rects: Vec::new(),
                                                                polygons: Vec::new(),
                                                            };
                                                            new_layer.polygons.push(
                                                                DefPolygon { points },
                                                            );
                                                            layers.push(new_layer);
                                                        }
                                                    }
                                                }
                                            }
                                            _ => {}
                                        }
                                    }
                                }
                                i += 1;
                            }

                            vias.push(DefVia {
                                name: via_name,
                                layers,
                                via_rule: None,
                                cut_size: None,
                                cut_spacing: None,
                                enclosure: Vec::new(),
                                pattern: String::new(),
                            });
                            continue;
                        }
                        i += 1;
                    }
                }
            }
            _ => {}
        }
        i += 1;
    }

    if die_area_points.is_empty() {
        log_warn!("DEF has no DIEAREA statement");
    }
    log_info!(
        "DEF parsed: {} die points, {} components, {} pins, {} nets",
        die_area_points.len(),
        components.len(),
        pins.len(),
        nets.len()
    );

    Ok((
        "",
        Def {
            die_area_points,
            g_cell_grid_x,
            g_cell_grid_y,
            pins,
            nets,
            components,
            rows: Vec::new(),
            tracks_x: Vec::new(),
            tracks_y: Vec::new(),
            vias,
        },
    ))
}

pub fn parse_def(input: &str) -> IResult<&str, Def> {
    parse_def_simple(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_die_area_statement() {
        let (_, points) = parse_die_area("DIEAREA ( 0 0 ) ( 1000 2000 ) ;").unwrap();
        assert_eq!(points, vec![(0.0, 0.0), (1000.0, 2000.0)]);
    }

    #[test]
    fn identifier_allows_bus_bracket_free_names() {
        let (_, name) = identifier("my_net.1/sub").unwrap();
        assert_eq!(name, "my_net.1/sub");
    }

    #[test]
    fn string_literal_unquotes() {
        let (_, s) = string_literal("\"quoted name\" rest").unwrap();
        assert_eq!(s, "\"quoted name");
    }

    #[test]
    fn parses_fixed_component_with_placement() {
        let lines = ["- u1 AND2X1 + FIXED ( 100 200 ) N ;"];
        let (comps, _) = parse_components_section(&lines, 0);
        assert_eq!(comps.len(), 1);
        let placement = comps[0].placement.as_ref().unwrap();
        assert_eq!(placement.placement_type, "FIXED");
        assert_eq!(placement.x, 100.0);
        assert_eq!(placement.y, 200.0);
        assert_eq!(placement.orientation, "N");
    }

    #[test]
    fn parses_pin_with_direction_and_placement() {
        let lines = [
            "- clk + NET clk + DIRECTION INPUT + USE CLOCK",
            "  + PLACED ( 10 20 ) N ;",
        ];
        let (pins, _) = parse_pins_section(&lines, 0);
        assert_eq!(pins.len(), 1);
        assert_eq!(pins[0].net, "clk");
        assert_eq!(pins[0].direction, "INPUT");
        assert_eq!(pins[0].use_type, "CLOCK");
        assert_eq!(pins[0].x, 10.0);
        assert_eq!(pins[0].y, 20.0);
    }

    #[test]
    fn parses_net_with_two_pin_connections() {
        let lines = ["- clk ( PIN clk ) ( u1 A ) + USE SIGNAL ;"];
        let (nets, _) = parse_nets_section(&lines, 0);
        assert_eq!(nets.len(), 1);
        assert_eq!(nets[0].connections, 2);
        assert_eq!(nets[0].instances, vec!["u1".to_string()]);
        assert_eq!(nets[0].use_type, "SIGNAL");
    }

    #[test]
    fn parses_minimal_def() {
        let input = "DIEAREA ( 0 0 ) ( 100 100 ) ;\nCOMPONENTS 0 ;\nEND COMPONENTS\nPINS 0 ;\nEND PINS\nNETS 0 ;\nEND NETS\n";
        let (_, def) = parse_def(input).unwrap();
        assert_eq!(def.die_area_points.len(), 2);
        assert!(def.components.is_empty());
    }
}
