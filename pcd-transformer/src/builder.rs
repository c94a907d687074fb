use crate::{
    arguments::Arguments,
    chain::OperationChain,
    error::ParseError,
    filter::{CriteriaFilter, Criterion},
    transform::{attribute, catalog, coordinate, catalog::SetPointSource, mapping, raw, Operation},
};

type ParseFn = fn(&str, &mut Arguments<'_>) -> Option<Result<Box<dyn Operation>, ParseError>>;

const OPERATION_PARSERS: [ParseFn; 5] = [
    coordinate::parse,
    raw::parse,
    catalog::parse_table,
    attribute::parse_table,
    mapping::parse,
];

/// Settings that apply to the chain as a whole.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TransformOptions {
    pub auto_reoffset: bool,
    pub rescale: Option<[f64; 3]>,
}

#[derive(Debug)]
pub struct ParsedArguments {
    pub chain: OperationChain,
    pub options: TransformOptions,
    /// Indices of the tokens no flag consumed.
    pub leftover: Vec<usize>,
}

pub trait TransformBuilder {
    fn build(&self) -> Result<ParsedArguments, ParseError>;
}

/// Builds chains from single dash flags such as `-translate_x 10 -rotate_xy 45 0 0`.
#[derive(Debug, Clone)]
pub struct ArgumentTransformBuilder {
    tokens: Vec<String>,
}

impl ArgumentTransformBuilder {
    pub fn new(tokens: Vec<String>) -> Self {
        Self { tokens }
    }
}

impl TransformBuilder for ArgumentTransformBuilder {
    fn build(&self) -> Result<ParsedArguments, ParseError> {
        parse_arguments(&self.tokens)
    }
}

fn parse_operation(
    flag: &str,
    args: &mut Arguments<'_>,
) -> Option<Result<Box<dyn Operation>, ParseError>> {
    OPERATION_PARSERS.iter().find_map(|parse| parse(flag, args))
}

/// Parses `tokens` left to right. Every recognised flag consumes its arguments; anything
/// else is reported through [`ParsedArguments::leftover`].
pub fn parse_arguments(tokens: &[String]) -> Result<ParsedArguments, ParseError> {
    let mut chain = OperationChain::new();
    let mut options = TransformOptions::default();
    let mut filter = CriteriaFilter::default();
    let mut filtered = false;
    let mut leftover = Vec::new();

    let mut index = 0;
    while index < tokens.len() {
        let Some(flag) = tokens[index].strip_prefix('-') else {
            leftover.push(index);
            index += 1;
            continue;
        };
        let mut args = Arguments::new(flag, tokens, index + 1);

        match flag {
            "auto_reoffset" => options.auto_reoffset = true,
            "rescale" => {
                options.rescale = Some([
                    args.value("scale_x")?,
                    args.value("scale_y")?,
                    args.value("scale_z")?,
                ])
            }
            "filtered_transform" => filtered = true,
            _ => {
                if let Some(criterion) = Criterion::parse(flag, &mut args) {
                    filter.push(criterion?);
                } else if let Some(operation) = parse_operation(flag, &mut args) {
                    let operation = operation?;
                    if operation.name() == SetPointSource::FLAG {
                        chain.remove_operations_by_name(SetPointSource::FLAG);
                    }
                    chain.add_operation(operation);
                } else {
                    leftover.push(index);
                }
            }
        }
        index = args.position();
    }

    if let Some(scale) = options.rescale {
        if scale.iter().any(|s| *s == 0.0) {
            return Err(ParseError::InvalidValue {
                flag: "rescale".to_string(),
                name: "scale",
                token: format!("{} {} {}", scale[0], scale[1], scale[2]),
                reason: "scale factors must not be zero".to_string(),
            });
        }
    }
    if filtered && filter.is_empty() {
        return Err(ParseError::FilterMissing);
    }
    if !filter.is_empty() {
        chain.set_filter(Box::new(filter));
    }
    chain.set_filtered(filtered);

    log::debug!("parsed {} operations", chain.len());
    Ok(ParsedArguments {
        chain,
        options,
        leftover,
    })
}
