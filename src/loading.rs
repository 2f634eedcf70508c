//! Reading the products table, the shelters table and the run configuration.
//!
//! Tables are plain comma-separated files with a header line. Fields may be
//! double-quoted, with `""` standing for a literal quote; quoted fields do not
//! span lines. Columns are matched by header name, so their order is free.
//! Product columns the model does not read are kept for the output table.

use std::collections::{BTreeMap, HashSet};
use std::fs::read_to_string;
use std::path::Path;
use std::str::FromStr;

use crate::error::LoadError;
use crate::types::{ArticleId, Category, Config, Product, Shelter, ShelterRule, scale_volume};

pub const ARTICLE: &str = "article";
pub const PRODUCT_TYPE: &str = "product_type";
pub const CONVENIENCE_VALUE: &str = "convenience_value";
pub const PRODUCT_VOLUME: &str = "product_volume";
pub const PRODUCT_PRICE: &str = "product_price";
pub const SHELTER_NAME: &str = "shelter_name";

/// A parsed table: header plus rows, each row tagged with its 1-based line.
#[derive(Debug)]
struct Table {
    name: String,
    header: Vec<String>,
    rows: Vec<(usize, Vec<String>)>,
}

impl Table {
    fn parse(name: &str, text: &str) -> Result<Self, LoadError> {
        let text = text.strip_prefix('\u{feff}').unwrap_or(text);
        let mut lines = text
            .lines()
            .enumerate()
            .map(|(i, line)| (i + 1, line))
            .filter(|(_, line)| !line.trim().is_empty());

        let syntax = |line: usize, message: String| LoadError::Syntax {
            table: name.to_owned(),
            line,
            message,
        };

        let (header_line, header) = lines
            .next()
            .ok_or_else(|| syntax(1, "missing header".into()))?;
        let header = split_fields(header).map_err(|m| syntax(header_line, m))?;

        let mut rows = Vec::new();
        for (line, text) in lines {
            let fields = split_fields(text).map_err(|m| syntax(line, m))?;
            if fields.len() != header.len() {
                return Err(syntax(
                    line,
                    format!("expected {} fields, found {}", header.len(), fields.len()),
                ));
            }
            rows.push((line, fields));
        }

        Ok(Table {
            name: name.to_owned(),
            header,
            rows,
        })
    }

    fn column(&self, column: &str) -> Result<usize, LoadError> {
        self.header
            .iter()
            .position(|h| h == column)
            .ok_or_else(|| LoadError::MissingColumn {
                table: self.name.clone(),
                column: column.to_owned(),
            })
    }

    fn value<T: FromStr>(&self, line: usize, column: &str, raw: &str) -> Result<T, LoadError> {
        raw.trim().parse().map_err(|_| LoadError::InvalidValue {
            table: self.name.clone(),
            line,
            column: column.to_owned(),
            value: raw.to_owned(),
        })
    }
}

fn split_fields(line: &str) -> Result<Vec<String>, String> {
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut chars = line.chars().peekable();
    let mut quoted = false;

    while let Some(c) = chars.next() {
        match (c, quoted) {
            ('"', false) if field.trim().is_empty() => {
                field.clear();
                quoted = true;
            }
            ('"', true) if chars.peek() == Some(&'"') => {
                chars.next();
                field.push('"');
            }
            ('"', true) => quoted = false,
            (',', false) => fields.push(std::mem::take(&mut field)),
            (c, _) => field.push(c),
        }
    }

    if quoted {
        return Err("unterminated quoted field".into());
    }
    fields.push(field);
    Ok(fields)
}

/// The products table as read: its header and one product per row.
#[derive(Debug, Clone)]
pub struct ProductTable {
    pub columns: Vec<String>,
    pub products: Vec<Product>,
}

/// Parse the products table, scaling volumes by `volume_factor`.
pub fn parse_products(text: &str, volume_factor: u32) -> Result<ProductTable, LoadError> {
    let table = Table::parse("products", text)?;
    let article_col = table.column(ARTICLE)?;
    let category_col = table.column(PRODUCT_TYPE)?;
    let value_col = table.column(CONVENIENCE_VALUE)?;
    let volume_col = table.column(PRODUCT_VOLUME)?;
    let price_col = table.column(PRODUCT_PRICE)?;

    let products = table
        .rows
        .iter()
        .map(|(line, fields)| {
            let article = ArticleId(fields[article_col].trim().to_owned());
            let raw_volume: f64 = table.value(*line, PRODUCT_VOLUME, &fields[volume_col])?;
            if !raw_volume.is_finite() || raw_volume < 0.0 {
                return Err(LoadError::InvalidVolume {
                    article: article.to_string(),
                    volume: raw_volume,
                });
            }
            let price: i64 = table.value(*line, PRODUCT_PRICE, &fields[price_col])?;
            if price < 0 {
                return Err(LoadError::InvalidValue {
                    table: table.name.clone(),
                    line: *line,
                    column: PRODUCT_PRICE.to_owned(),
                    value: fields[price_col].clone(),
                });
            }

            Ok(Product {
                article,
                category: Category(fields[category_col].trim().to_owned()),
                convenience_value: table.value(*line, CONVENIENCE_VALUE, &fields[value_col])?,
                raw_volume,
                volume: scale_volume(raw_volume, volume_factor),
                price,
                record: fields.clone(),
            })
        })
        .collect::<Result<Vec<_>, LoadError>>()?;

    Ok(ProductTable {
        columns: table.header,
        products,
    })
}

/// Parse the shelters table. Every column other than `shelter_name` is a
/// category, and its cells are rules (`n` or `lo-hi`).
pub fn parse_shelters(text: &str) -> Result<Vec<Shelter>, LoadError> {
    let table = Table::parse("shelters", text)?;
    let name = table.column(SHELTER_NAME)?;
    let categories: Vec<(usize, Category)> = table
        .header
        .iter()
        .enumerate()
        .filter(|&(i, _)| i != name)
        .map(|(i, h)| (i, Category(h.trim().to_owned())))
        .collect();

    let mut seen = HashSet::new();
    let mut shelters = Vec::with_capacity(table.rows.len());
    for (_, fields) in &table.rows {
        let shelter_name = fields[name].trim().to_owned();
        if !seen.insert(shelter_name.clone()) {
            return Err(LoadError::DuplicateShelter(shelter_name));
        }

        let rules = categories
            .iter()
            .map(|(i, category)| Ok((category.clone(), fields[*i].parse::<ShelterRule>()?)))
            .collect::<Result<BTreeMap<_, _>, LoadError>>()?;

        shelters.push(Shelter {
            name: shelter_name,
            rules,
        });
    }
    Ok(shelters)
}

fn read(path: &Path) -> Result<String, LoadError> {
    read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_owned(),
        source,
    })
}

pub fn load_products(path: &Path, volume_factor: u32) -> Result<ProductTable, LoadError> {
    parse_products(&read(path)?, volume_factor)
}

pub fn load_shelters(path: &Path) -> Result<Vec<Shelter>, LoadError> {
    parse_shelters(&read(path)?)
}

pub fn parse_config(text: &str) -> Result<Config, LoadError> {
    let config: Config = serde_yaml::from_str(text)?;
    config.validate()?;
    Ok(config)
}

pub fn load_config(path: &Path) -> Result<Config, LoadError> {
    parse_config(&read(path)?)
}
