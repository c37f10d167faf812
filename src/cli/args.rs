use std::env;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use super::CliError;
use crate::config::WorkshopConfig;
use crate::item::{is_valid_tag, parse_tag_list, ItemEdit, Visibility, MAX_TAG_LENGTH};
use crate::query::{BrowseFilter, FindOrder, QueryOptions};
use crate::transport::ItemId;

/// One `name` or `name=value` argument.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CliOption {
    pub name: String,
    pub value: String,
}

/// Split arguments (program name excluded) into options.
pub fn parse_options<S: AsRef<str>>(args: &[S]) -> Result<Vec<CliOption>, CliError> {
    args.iter()
        .map(|arg| {
            let arg = arg.as_ref();
            let (name, value) = match arg.split_once('=') {
                Some((name, value)) => (name, value),
                None => (arg, ""),
            };
            if name.chars().any(char::is_whitespace) {
                return Err(CliError::InvalidOptionName(name.to_string()));
            }
            Ok(CliOption {
                name: name.to_string(),
                value: value.to_string(),
            })
        })
        .collect()
}

/// Remove the leading command; `help` when there is none.
pub fn take_command(options: &mut Vec<CliOption>) -> Result<String, CliError> {
    if options.is_empty() {
        return Ok("help".to_string());
    }
    let command = options.remove(0);
    if !command.value.is_empty() {
        return Err(CliError::CommandWithValue(command.name));
    }
    Ok(command.name)
}

pub fn parse_item_id(value: &str) -> Result<ItemId, CliError> {
    match value.trim().parse::<ItemId>() {
        Ok(id) if id > 0 => Ok(id),
        _ => Err(CliError::InvalidId(value.to_string())),
    }
}

pub fn parse_visibility(value: &str) -> Result<Visibility, CliError> {
    match value.parse::<Visibility>() {
        Ok(Visibility::Unlisted) | Err(_) => Err(CliError::InvalidVisibility(value.to_string())),
        Ok(visibility) => Ok(visibility),
    }
}

pub fn parse_order(value: &str) -> Result<FindOrder, CliError> {
    value
        .parse::<FindOrder>()
        .map_err(|_| CliError::InvalidOrder(value.to_string()))
}

pub fn parse_item_count(value: &str) -> Result<usize, CliError> {
    match value.trim().parse::<usize>() {
        Ok(count) if count > 0 => Ok(count),
        _ => Err(CliError::InvalidCount(value.to_string())),
    }
}

/// Validate a comma separated tag list, warning about tags the
/// application does not know.
pub fn parse_tags<W: Write>(
    list: &str,
    config: &WorkshopConfig,
    out: &mut W,
) -> Result<Vec<String>, CliError> {
    let tags = parse_tag_list(list);
    let mut not_standard = false;
    for tag in &tags {
        if !is_valid_tag(tag) {
            return Err(CliError::InvalidTag {
                tag: tag.clone(),
                max: MAX_TAG_LENGTH,
            });
        }
        if !config.is_standard_tag(tag) {
            writeln!(out, "Warning: not-standard tag: {}", tag)?;
            not_standard = true;
        }
    }
    if not_standard {
        write_standard_tags(config, out)?;
    }
    Ok(tags)
}

pub fn write_standard_tags<W: Write>(config: &WorkshopConfig, out: &mut W) -> Result<(), CliError> {
    writeln!(out, "Tags accepted by app {}:", config.app_id)?;
    for tag in &config.standard_tags {
        writeln!(out, "'{}'", tag)?;
    }
    writeln!(out)?;
    Ok(())
}

fn absolute(value: &str) -> Result<PathBuf, CliError> {
    let path = Path::new(value);
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    Ok(env::current_dir()?.join(path))
}

pub fn parse_file_path(value: &str) -> Result<String, CliError> {
    let path = absolute(value)?;
    if !path.is_file() {
        return Err(CliError::MissingFile(path.display().to_string()));
    }
    Ok(path.display().to_string())
}

pub fn parse_folder_path(value: &str) -> Result<String, CliError> {
    if value.is_empty() {
        return Err(CliError::EmptyPath);
    }
    let path = absolute(value)?;
    if !path.is_dir() {
        return Err(CliError::MissingFolder(path.display().to_string()));
    }
    Ok(path.display().to_string())
}

pub fn load_file_contents(value: &str) -> Result<String, CliError> {
    let path = parse_file_path(value)?;
    fs::read_to_string(&path).map_err(|source| CliError::ReadFile { path, source })
}

/// Arguments of `add` and `update`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ItemArgs {
    pub id: Option<ItemId>,
    pub edit: ItemEdit,
}

pub fn parse_item_args<W: Write>(
    options: &[CliOption],
    config: &WorkshopConfig,
    out: &mut W,
) -> Result<ItemArgs, CliError> {
    let mut args = ItemArgs::default();
    for option in options {
        let value = option.value.as_str();
        match option.name.as_str() {
            "id" => args.id = Some(parse_item_id(value)?),
            "title" => args.edit.title = Some(value.to_string()),
            "folder" => args.edit.content_folder = Some(parse_folder_path(value)?),
            "preview" => args.edit.preview_file = Some(parse_file_path(value)?),
            "tags" => args.edit.tags = Some(parse_tags(value, config, out)?),
            "desc" => args.edit.description = Some(load_file_contents(value)?),
            "visibility" => args.edit.visibility = Some(parse_visibility(value)?),
            other => writeln!(out, "Ignored option: {}", other)?,
        }
    }
    Ok(args)
}

/// Arguments of `find`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FindArgs {
    pub options: QueryOptions,
    pub filter: BrowseFilter,
    pub max_count: Option<usize>,
}

pub fn parse_find_args<W: Write>(options: &[CliOption], out: &mut W) -> Result<FindArgs, CliError> {
    let mut args = FindArgs::default();
    for option in options {
        let value = option.value.as_str();
        match option.name.as_str() {
            "phrase" => args.options.search_text = Some(value.to_string()),
            "tags" => args.filter.tags = parse_tag_list(value),
            "any-tag" => args.filter.match_any_tag = true,
            "order" => args.filter.order = parse_order(value)?,
            "max-count" => args.max_count = Some(parse_item_count(value)?),
            other => writeln!(out, "Ignored option: {}", other)?,
        }
    }
    Ok(args)
}

/// Arguments of `info` and `download`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct InfoArgs {
    pub ids: Vec<ItemId>,
    pub metadata: bool,
    pub key_values: bool,
}

pub fn parse_info_args<W: Write>(
    options: &[CliOption],
    with_flags: bool,
    out: &mut W,
) -> Result<InfoArgs, CliError> {
    let mut args = InfoArgs::default();
    for option in options {
        match option.name.as_str() {
            "id" => args.ids.push(parse_item_id(&option.value)?),
            "metadata" if with_flags => args.metadata = true,
            "key-values" if with_flags => args.key_values = true,
            other => writeln!(out, "Ignored option: {}", other)?,
        }
    }
    if args.ids.is_empty() {
        return Err(CliError::MissingIds);
    }
    Ok(args)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(args: &[&str]) -> Vec<CliOption> {
        parse_options(args).unwrap()
    }

    #[test]
    fn splits_names_and_values() {
        let parsed = options(&["find", "phrase=big castle", "any-tag", "tags=a=b"]);
        assert_eq!(parsed[1].name, "phrase");
        assert_eq!(parsed[1].value, "big castle");
        assert_eq!(parsed[2].value, "");
        assert_eq!(parsed[3].value, "a=b");
        assert!(parse_options(&["bad name=1"]).is_err());
    }

    #[test]
    fn command_defaults_to_help() {
        let mut parsed = Vec::new();
        assert_eq!(take_command(&mut parsed).unwrap(), "help");

        let mut parsed = options(&["find=now"]);
        assert!(matches!(
            take_command(&mut parsed),
            Err(CliError::CommandWithValue(_))
        ));
    }

    #[test]
    fn ids_must_be_positive() {
        assert_eq!(parse_item_id("1806744451").unwrap(), 1_806_744_451);
        assert!(parse_item_id("0").is_err());
        assert!(parse_item_id("-4").is_err());
        assert!(parse_item_id("abc").is_err());
    }

    #[test]
    fn unlisted_is_not_offered() {
        assert_eq!(parse_visibility("friends").unwrap(), Visibility::FriendsOnly);
        assert!(parse_visibility("unlisted").is_err());
    }

    #[test]
    fn unknown_tags_draw_a_warning() {
        let config = WorkshopConfig::default();
        let mut out = Vec::new();
        let tags = parse_tags("Alpha 29,Spooky", &config, &mut out).unwrap();
        assert_eq!(tags, vec!["Alpha 29", "Spooky"]);
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("Warning: not-standard tag: Spooky"));
        assert!(!text.contains("not-standard tag: Alpha 29"));

        let mut out = Vec::new();
        assert!(matches!(
            parse_tags("bad\ttag", &config, &mut out),
            Err(CliError::InvalidTag { .. })
        ));
    }

    #[test]
    fn find_args() {
        let mut out = Vec::new();
        let args = parse_find_args(
            &options(&["phrase=castle", "order=date", "max-count=5", "any-tag", "colour=red"]),
            &mut out,
        )
        .unwrap();
        assert_eq!(args.options.search_text.as_deref(), Some("castle"));
        assert_eq!(args.filter.order, FindOrder::Date);
        assert!(args.filter.match_any_tag);
        assert_eq!(args.max_count, Some(5));
        assert_eq!(String::from_utf8(out).unwrap(), "Ignored option: colour\n");

        assert!(parse_find_args(&options(&["max-count=0"]), &mut Vec::new()).is_err());
    }

    #[test]
    fn download_ignores_display_flags() {
        let mut out = Vec::new();
        let args = parse_info_args(&options(&["id=4", "metadata", "id=9"]), false, &mut out).unwrap();
        assert_eq!(args.ids, vec![4, 9]);
        assert!(!args.metadata);
        assert_eq!(String::from_utf8(out).unwrap(), "Ignored option: metadata\n");
    }

    #[test]
    fn item_args_read_description_file() {
        let dir = tempfile::tempdir().unwrap();
        let desc = dir.path().join("desc.txt");
        fs::write(&desc, "A castle.").unwrap();

        let desc_arg = format!("desc={}", desc.display());
        let folder_arg = format!("folder={}", dir.path().display());
        let config = WorkshopConfig::default();
        let mut out = Vec::new();
        let args = parse_item_args(
            &options(&[&desc_arg, &folder_arg, "visibility=private", "id=12"]),
            &config,
            &mut out,
        )
        .unwrap();
        assert_eq!(args.id, Some(12));
        assert_eq!(args.edit.description.as_deref(), Some("A castle."));
        assert_eq!(args.edit.visibility, Some(Visibility::Private));
        assert!(args.edit.content_folder.is_some());

        let missing_arg = format!("folder={}", dir.path().join("missing").display());
        assert!(matches!(
            parse_item_args(&options(&[&missing_arg]), &config, &mut out),
            Err(CliError::MissingFolder(_))
        ));
    }
}
