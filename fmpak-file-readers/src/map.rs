use std::{
    collections::{HashMap, HashSet},
    fmt,
};

use crate::{
    reader::{FmFileReader, ReadError},
    FmFile,
};

#[derive(Debug, Default, Clone, PartialEq)]
pub struct MapBrush {
    pub id: Option<u32>,
    pub materials: HashSet<String>,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct MapPatch {
    pub id: Option<u32>,
    pub material: Option<String>,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct MapEntity {
    pub id: Option<u32>,
    pub classname: String,
    pub name: Option<String>,
    pub properties: HashMap<String, String>,
    pub brushes: Vec<MapBrush>,
    pub patches: Vec<MapPatch>,
    pub materials: HashSet<String>,
}

impl MapEntity {
    fn new(id: Option<u32>) -> Self {
        Self {
            id,
            ..Default::default()
        }
    }

    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(|value| value.as_str())
    }

    fn set_property(&mut self, key: String, value: String) {
        match key.as_str() {
            "classname" => self.classname = value.clone(),
            "name" => self.name = Some(value.clone()),
            _ => {}
        }
        self.properties.insert(key, value);
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct MapFile {
    pub version: Option<u32>,
    pub entities: Vec<MapEntity>,
}

#[derive(Debug, Clone, PartialEq)]
enum MapScope {
    File,
    EntityBody,
    PropertyValue(String),
    PrimitiveDecl,
    BrushFace { opened: bool },
    PatchFace { opened: bool },
}

impl fmt::Display for MapScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MapScope::File => write!(f, "file"),
            MapScope::EntityBody => write!(f, "entity"),
            MapScope::PropertyValue(key) => write!(f, "property value ({})", key),
            MapScope::PrimitiveDecl => write!(f, "primitive"),
            MapScope::BrushFace { .. } => write!(f, "brush"),
            MapScope::PatchFace { .. } => write!(f, "patch"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum MapToken<'a> {
    Quoted(&'a str),
    Raw(&'a str),
}

enum Marker {
    Entity(u32),
    Primitive(u32),
}

fn parse_marker(comment: &str) -> Option<Marker> {
    let mut words = comment.trim_start_matches('/').split_whitespace();
    let kind = words.next()?;
    let id = words.next()?.parse::<u32>().ok()?;
    if words.next().is_some() {
        return None;
    }

    match kind {
        "entity" => Some(Marker::Entity(id)),
        "primitive" => Some(Marker::Primitive(id)),
        _ => None,
    }
}

/// Splits a line starting with a quote into its first quoted string and,
/// when present, the quoted remainder of the line.
fn split_quoted(line: &str) -> (&str, Option<&str>) {
    let inner = &line[1..];
    match inner.find('"') {
        Some(end) => {
            let key = &inner[..end];
            let rest = inner[end + 1..].trim();
            if rest.is_empty() {
                (key, None)
            } else {
                (key, Some(unquote(rest)))
            }
        }
        None => (inner, None),
    }
}

fn unquote(value: &str) -> &str {
    let value = value.strip_prefix('"').unwrap_or(value);
    value.strip_suffix('"').unwrap_or(value)
}

/// The texture of a brush face is the text between the first and last quote.
fn face_material(line: &str) -> Option<&str> {
    let start = line.find('"')?;
    let end = line.rfind('"')?;
    if end > start {
        Some(&line[start + 1..end])
    } else {
        None
    }
}

struct MapParser {
    scope: MapScope,
    entity_id: Option<u32>,
    primitive_id: Option<u32>,
    entity: Option<MapEntity>,
    brush: Option<MapBrush>,
    patch: Option<MapPatch>,
    map: MapFile,
}

impl MapParser {
    fn new() -> Self {
        Self {
            scope: MapScope::File,
            entity_id: None,
            primitive_id: None,
            entity: None,
            brush: None,
            patch: None,
            map: MapFile::default(),
        }
    }

    fn malformed(&self, line_number: usize, line: &str) -> ReadError {
        ReadError::MalformedMapFile {
            line_number,
            line: line.to_string(),
            scope: self.scope.to_string(),
        }
    }

    fn read_line(&mut self, line_number: usize, line: &str) -> Result<(), ReadError> {
        if line.starts_with('/') {
            match parse_marker(line) {
                Some(Marker::Entity(id)) if self.scope == MapScope::File => {
                    self.entity_id = Some(id);
                }
                Some(Marker::Primitive(id)) if self.scope == MapScope::EntityBody => {
                    self.primitive_id = Some(id);
                }
                _ => {}
            }
            return Ok(());
        }

        if line.starts_with('(') {
            return match self.scope {
                MapScope::BrushFace { opened: true } => match face_material(line) {
                    Some(material) => self.feed(MapToken::Quoted(material), line_number, line),
                    None => Ok(()),
                },
                // Patch geometry rows carry no texture, it comes on the header line
                MapScope::PatchFace { opened: true } => Ok(()),
                _ => Err(self.malformed(line_number, line)),
            };
        }

        if line.starts_with('"') {
            if !matches!(
                self.scope,
                MapScope::EntityBody | MapScope::PropertyValue(_) | MapScope::PatchFace { .. }
            ) {
                return Err(self.malformed(line_number, line));
            }

            let (first, rest) = split_quoted(line);
            self.feed(MapToken::Quoted(first), line_number, line)?;
            if let Some(rest) = rest {
                self.feed(MapToken::Quoted(rest), line_number, line)?;
            }
            return Ok(());
        }

        self.feed(MapToken::Raw(line), line_number, line)
    }

    fn feed(&mut self, token: MapToken, line_number: usize, line: &str) -> Result<(), ReadError> {
        let scope = std::mem::replace(&mut self.scope, MapScope::File);
        self.scope = match (scope, token) {
            (MapScope::File, MapToken::Raw("{")) => {
                self.entity = Some(MapEntity::new(self.entity_id));
                MapScope::EntityBody
            }
            (MapScope::File, MapToken::Raw(header)) if header.starts_with("Version") => {
                self.map.version = header
                    .split_whitespace()
                    .nth(1)
                    .and_then(|version| version.parse().ok());
                MapScope::File
            }
            (MapScope::EntityBody, MapToken::Quoted(key)) => {
                MapScope::PropertyValue(key.to_string())
            }
            (MapScope::EntityBody, MapToken::Raw("{")) => MapScope::PrimitiveDecl,
            (MapScope::EntityBody, MapToken::Raw("}")) => {
                if let Some(entity) = self.entity.take() {
                    self.map.entities.push(entity);
                }
                MapScope::File
            }
            (MapScope::PropertyValue(key), MapToken::Quoted(value)) => {
                if let Some(entity) = self.entity.as_mut() {
                    entity.set_property(key, value.to_string());
                }
                MapScope::EntityBody
            }
            (MapScope::PrimitiveDecl, MapToken::Raw(kind)) if kind.starts_with("brushDef") => {
                self.brush = Some(MapBrush {
                    id: self.primitive_id,
                    ..Default::default()
                });
                MapScope::BrushFace { opened: false }
            }
            (MapScope::PrimitiveDecl, MapToken::Raw(kind)) if kind.starts_with("patchDef") => {
                self.patch = Some(MapPatch {
                    id: self.primitive_id,
                    ..Default::default()
                });
                MapScope::PatchFace { opened: false }
            }
            (MapScope::PrimitiveDecl, MapToken::Raw("}")) => MapScope::EntityBody,
            (MapScope::BrushFace { opened: false }, MapToken::Raw("{")) => {
                MapScope::BrushFace { opened: true }
            }
            (MapScope::BrushFace { opened: true }, MapToken::Quoted(material)) => {
                if let Some(brush) = self.brush.as_mut() {
                    brush.materials.insert(material.to_string());
                }
                if let Some(entity) = self.entity.as_mut() {
                    entity.materials.insert(material.to_string());
                }
                MapScope::BrushFace { opened: true }
            }
            (MapScope::BrushFace { opened: true }, MapToken::Raw("}")) => {
                if let (Some(entity), Some(brush)) = (self.entity.as_mut(), self.brush.take()) {
                    entity.brushes.push(brush);
                }
                MapScope::PrimitiveDecl
            }
            (MapScope::PatchFace { opened: false }, MapToken::Raw("{")) => {
                MapScope::PatchFace { opened: true }
            }
            (MapScope::PatchFace { opened: true }, MapToken::Quoted(material))
                if self
                    .patch
                    .as_ref()
                    .map_or(false, |patch| patch.material.is_none()) =>
            {
                if let Some(patch) = self.patch.as_mut() {
                    patch.material = Some(material.to_string());
                }
                if let Some(entity) = self.entity.as_mut() {
                    entity.materials.insert(material.to_string());
                }
                MapScope::PatchFace { opened: true }
            }
            // Closes the control point matrix
            (MapScope::PatchFace { opened: true }, MapToken::Raw(")")) => {
                MapScope::PatchFace { opened: true }
            }
            (MapScope::PatchFace { opened: true }, MapToken::Raw("}")) => {
                if let (Some(entity), Some(patch)) = (self.entity.as_mut(), self.patch.take()) {
                    entity.patches.push(patch);
                }
                MapScope::PrimitiveDecl
            }
            (scope, _) => {
                self.scope = scope;
                return Err(self.malformed(line_number, line));
            }
        };

        Ok(())
    }

    fn finish(mut self) -> Result<MapFile, ReadError> {
        if self.scope != MapScope::File
            || self.entity.is_some()
            || self.brush.is_some()
            || self.patch.is_some()
        {
            return Err(ReadError::UnterminatedBlock {
                scope: self.scope.to_string(),
            });
        }

        // Some entities declare their material directly rather than through geometry
        for entity in self.map.entities.iter_mut() {
            if let Some(texture) = entity.properties.get("texture") {
                entity.materials.insert(texture.clone());
            }
        }

        Ok(self.map)
    }
}

impl FmFile for MapFile {
    type ReadOptions = ();

    fn read(reader: FmFileReader, _: &Self::ReadOptions) -> Result<Self, anyhow::Error> {
        let mut parser = MapParser::new();
        for (line_number, line) in reader.lines() {
            parser.read_line(line_number, line)?;
        }
        Ok(parser.finish()?)
    }
}
