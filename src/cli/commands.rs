use std::io::Write;
use std::time::Duration;

use tracing::warn;

use super::args::{
    parse_find_args, parse_info_args, parse_item_args, write_standard_tags, CliOption, FindArgs,
    InfoArgs, ItemArgs,
};
use super::CliError;
use crate::arena::SlotId;
use crate::client::WorkshopClient;
use crate::config::WorkshopConfig;
use crate::item::{format_tags, next_item_version, parse_item_version, ItemOutcome};
use crate::query::{collect_browse_pages, QueryOptions, QueryStatus};
use crate::transport::{ItemId, Transport};

/// A parsed command line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    Help,
    HelpTags,
    Add(ItemArgs),
    Update(ItemArgs),
    Find(FindArgs),
    Info(InfoArgs),
    Download(InfoArgs),
}

impl Command {
    pub fn parse<W: Write>(
        name: &str,
        options: &[CliOption],
        config: &WorkshopConfig,
        out: &mut W,
    ) -> Result<Self, CliError> {
        match name {
            "help" => Ok(Command::Help),
            "help-tags" => Ok(Command::HelpTags),
            "add" => {
                let args = parse_item_args(options, config, out)?;
                if args.edit.title.is_none() || args.edit.content_folder.is_none() {
                    return Err(CliError::MissingAddFields);
                }
                Ok(Command::Add(args))
            }
            "update" => {
                let args = parse_item_args(options, config, out)?;
                if args.id.is_none() {
                    return Err(CliError::MissingUpdateId);
                }
                Ok(Command::Update(args))
            }
            "find" => Ok(Command::Find(parse_find_args(options, out)?)),
            "info" => Ok(Command::Info(parse_info_args(options, true, out)?)),
            "download" => Ok(Command::Download(parse_info_args(options, false, out)?)),
            other => Err(CliError::UnknownCommand(other.to_string())),
        }
    }
}

pub fn write_help<W: Write>(out: &mut W) -> Result<(), CliError> {
    out.write_all(
        b"Commands:
  help      print this help
  help-tags print list of accepted tags
  add       add new workshop item
  update    update workshop item
  find      look for workshop items
  download  download specified items to the local cache
  info      print information about workshop items
            multiple id's can be passed

Add / Update options:
  id={}         unique identifier of the item
  title={}      specify new title
  folder={}     specify folder with item contents
  preview={}    specify file with preview image
  tags={}       specify tags separated by comma; an empty list removes all tags
  desc={}       specify file with item description
  visibility={} public, friends or private

Find options:
  phrase={}    filter items by phrase (from title or description)
  tags={}      list of tags separated by comma; items have to match all of them
               unless 'any-tag' option is used
  any-tag      return items which match at least one tag
  max-count={} limit number of items fetched
  order={}     order in which items will be returned; valid arguments:
               votes, date, subscriptions, playtime

Download / Info options:
  id={}        id of item to download / get info about; it can be specified multiple times
  key-values   display key-values
  metadata     display metadata information

Examples:
$ workshop add title=\"My new mod\" folder=\"my_new_mod/\" desc=my_new_mod.txt tags=\"Alpha 29\"
$ workshop update id=1806744451 desc=updated_description.txt
$ workshop find tags=\"Alpha 29\"
",
    )?;
    Ok(())
}

/// Run a parsed command against an open session.
pub fn execute<T: Transport, W: Write>(
    command: &Command,
    client: &mut WorkshopClient<T>,
    out: &mut W,
) -> Result<(), CliError> {
    match command {
        Command::Help => write_help(out),
        Command::HelpTags => write_standard_tags(client.config(), out),
        Command::Add(args) | Command::Update(args) => update_item(client, args, out),
        Command::Find(args) => find_items(client, args, out),
        Command::Info(args) => print_items_info(client, args, out),
        Command::Download(args) => download_items(client, &args.ids, out),
    }
}

/// Wait for a query; on failure finish it and report why.
fn wait_query<T: Transport>(
    client: &mut WorkshopClient<T>,
    slot: SlotId,
    timeout: Duration,
) -> Result<(), CliError> {
    let finished = client.wait_for_queries(&[slot], timeout);
    if finished && client.query_status(slot) == QueryStatus::Completed {
        return Ok(());
    }
    let error = if finished {
        client.query_error(slot)
    } else {
        "Query took too much time".to_string()
    };
    client.finish_query(slot);
    Err(CliError::Query(error))
}

fn wait_for_deletions<T: Transport>(client: &mut WorkshopClient<T>) {
    let timeout = client.config().details_timeout();
    if !client.wait_until(timeout, |client| client.pending_deletions() == 0) {
        warn!(pending = client.pending_deletions(), "deletions still pending");
    }
}

fn update_item<T: Transport, W: Write>(
    client: &mut WorkshopClient<T>,
    args: &ItemArgs,
    out: &mut W,
) -> Result<(), CliError> {
    let previous = match args.id {
        Some(id) => {
            let options = QueryOptions {
                metadata: true,
                ..Default::default()
            };
            let timeout = client.config().query_timeout();
            let slot = client.create_details_query(options, &[id]);
            wait_query(client, slot, timeout)?;
            client
                .finish_details_query(slot)
                .first()
                .and_then(|details| details.metadata.as_deref())
                .and_then(parse_item_version)
        }
        None => None,
    };
    let version = next_item_version(previous);

    let mut edit = args.edit.clone();
    edit.metadata = Some(version.to_string());

    writeln!(out, "Updating item...")?;
    if let Some(folder) = &edit.content_folder {
        writeln!(out, "Folder: {}", folder)?;
    }

    let slot = client.begin_item(edit, args.id);
    let timeout = client.config().update_timeout();
    let finished = client.wait_until(timeout, |client| client.item_phase(slot).is_terminal())
        || client.item_phase(slot).is_terminal();
    if !finished {
        writeln!(out, "Timeout!")?;
        client.cancel_item(slot);
        client.finish_item(slot);
        wait_for_deletions(client);
        return Ok(());
    }

    match client.finish_item(slot) {
        Some(ItemOutcome::Succeeded {
            item_id,
            created,
            legal_agreement_required,
        }) => {
            writeln!(out, "Item {}!", if created { "created" } else { "updated" })?;
            if created {
                writeln!(out, "ID: {}", item_id)?;
            }
            if legal_agreement_required {
                writeln!(
                    out,
                    "The workshop legal agreement has to be accepted before the item becomes visible."
                )?;
            }
        }
        Some(ItemOutcome::Failed {
            reason,
            item_id,
            created,
        }) => {
            writeln!(out, "{}", reason)?;
            if let (true, Some(item_id)) = (created, item_id) {
                client.delete_item(item_id);
            }
        }
        None => {}
    }
    wait_for_deletions(client);
    writeln!(out, "Version: {}", version)?;
    Ok(())
}

fn find_items<T: Transport, W: Write>(
    client: &mut WorkshopClient<T>,
    args: &FindArgs,
    out: &mut W,
) -> Result<(), CliError> {
    let timeout = client.config().query_timeout();
    let report = collect_browse_pages(client, &args.options, &args.filter, args.max_count, timeout)?;

    if !report.ids.is_empty() {
        let slot = client.create_details_query(QueryOptions::default(), &report.ids);
        wait_query(client, slot, timeout)?;
        for info in client.finish_details_query(slot) {
            writeln!(out, "{:>12}  {}", info.details.id, info.details.title)?;
        }
    }

    writeln!(out)?;
    writeln!(out, "{} items found.", report.ids.len())?;
    Ok(())
}

/// First line of `desc`, cut to fit in `max_len` characters with an
/// ellipsis when anything was dropped.
pub(crate) fn shorten_desc(desc: &str, max_len: usize) -> String {
    let limit = max_len.saturating_sub(3);
    let mut shortened = false;
    let mut text: String = desc.chars().take(limit).collect();
    if text.len() < desc.len() {
        shortened = true;
    }
    if let Some(pos) = text.find('\n') {
        text.truncate(pos);
        shortened = true;
    }
    if shortened {
        text.push_str("...");
    }
    text
}

fn print_items_info<T: Transport, W: Write>(
    client: &mut WorkshopClient<T>,
    args: &InfoArgs,
    out: &mut W,
) -> Result<(), CliError> {
    let options = QueryOptions {
        long_description: true,
        key_value_tags: args.key_values,
        metadata: args.metadata,
        playtime_stats_days: Some(5000),
        ..Default::default()
    };
    let timeout = client.config().details_timeout();
    let slot = client.create_details_query(options, &args.ids);
    wait_query(client, slot, timeout)?;

    for info in client.finish_details_query(slot) {
        let details = &info.details;
        if !details.is_valid() {
            writeln!(out, "Item {} INVALID!", details.id)?;
            continue;
        }
        let stats = &details.stats;
        let played = stats.seconds_played.unwrap_or_default();
        let (hours, minutes, seconds) = (played / 3600, played / 60 % 60, played % 60);

        writeln!(out, "Item {} ----------------------", details.id)?;
        writeln!(out, "        title: {}", details.title)?;
        writeln!(out, "  description: {}", shorten_desc(&details.description, 60))?;
        writeln!(out, "        state: {}", client.item_state(details.id))?;
        writeln!(out, "        owner: [{}]", details.owner_id)?;
        writeln!(
            out,
            "        score: {:.2} (+{} / -{})",
            details.score, details.votes_up, details.votes_down
        )?;
        writeln!(out, "         tags: {}", format_tags(&details.tags))?;
        writeln!(out, "creation time: {}", details.created_at)?;
        writeln!(out, "  update time: {}", details.updated_at)?;
        writeln!(
            out,
            "        stats: {} subscriptions, {} followers, {} favorites",
            stats.subscriptions, stats.followers, stats.favorites
        )?;
        writeln!(
            out,
            "               {} hours, {} minutes and {} seconds played; {} times played",
            hours,
            minutes,
            seconds,
            stats.playtime_sessions.unwrap_or_default()
        )?;
        writeln!(
            out,
            "               {} comments, {} website views",
            stats.comments, stats.unique_website_views
        )?;

        if args.key_values {
            writeln!(out, "    key-values:")?;
            for (key, value) in &info.key_value_tags {
                writeln!(out, "  {}: '{}'", key, value)?;
            }
        }
        if let Some(metadata) = &info.metadata {
            writeln!(out, "     metadata: '{}'", metadata)?;
        }
    }
    Ok(())
}

fn download_item<T: Transport, W: Write>(
    client: &mut WorkshopClient<T>,
    id: ItemId,
    out: &mut W,
) -> Result<(), CliError> {
    if !client.download_item(id, true) {
        writeln!(out, "   Error while downloading.")?;
        return Ok(());
    }

    write!(out, "   [")?;
    out.flush()?;
    let mut last_percentage = 0;
    let mut write_error = None;
    let timeout = client.config().download_timeout();
    client.wait_until(timeout, |client| {
        if let Some(progress) = client.download_progress(id) {
            let percentage = progress.percentage();
            while last_percentage + 1 < percentage && write_error.is_none() {
                write_error = write!(out, ".").and_then(|_| out.flush()).err();
                last_percentage += 2;
            }
        }
        !client.is_downloading(id)
    });
    if let Some(err) = write_error {
        return Err(err.into());
    }
    writeln!(out, "]")?;
    Ok(())
}

fn download_items<T: Transport, W: Write>(
    client: &mut WorkshopClient<T>,
    ids: &[ItemId],
    out: &mut W,
) -> Result<(), CliError> {
    let timeout = client.config().query_timeout();
    let slot = client.create_details_query(QueryOptions::default(), ids);
    wait_query(client, slot, timeout)?;
    let infos = client.finish_details_query(slot);

    for (index, &id) in ids.iter().enumerate() {
        let title = infos
            .get(index)
            .map(|info| info.details.title.as_str())
            .unwrap_or_default();
        writeln!(out, "*) Item {} '{}':", id, title)?;
        writeln!(out, "   State: {}", client.item_state(id))?;
        if !client.is_installed(id) {
            download_item(client, id, out)?;
        }

        match client.install_info(id) {
            Some(install) => {
                writeln!(out, "   Installed at: {}", install.folder)?;
                writeln!(out, "   Size: {}", install.size_on_disk)?;
            }
            None => writeln!(out, "   Invalid state: {}", client.item_state(id))?,
        }
        writeln!(out)?;
    }
    Ok(())
}
