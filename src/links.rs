//! Message links and id ranges as typed by a user.

use lazy_regex::{lazy_regex, Lazy};
use regex::Regex;

use crate::error::{Error, Result};
use crate::tg::{EntityRef, IterMessages};

static RE_PUBLIC_LINK: Lazy<Regex> = lazy_regex!(r"^((?:https?://)?t\.me/\w+)/(\d+)$");
static RE_PRIVATE_LINK: Lazy<Regex> = lazy_regex!(r"^(?:https?://)?t\.me/c/(\d+)/(\d+)$");

/// Split a message link into the chat it points at and the message id.
///
/// Public links keep the link itself as the chat reference
/// (`t.me/name/5` gives `t.me/name`), private `t.me/c/<id>/<msg>` links
/// give the numeric channel id.
pub fn parse_url_group(link: &str) -> Result<(EntityRef, i32)> {
    let link = link.trim();
    for re in [&RE_PUBLIC_LINK, &RE_PRIVATE_LINK] {
        if let Some(caps) = re.captures(link) {
            let message_id = caps[2]
                .parse::<i32>()
                .map_err(|_| Error::InvalidInput(format!("message id out of range: {:?}", link)))?;
            return Ok((EntityRef::from(&caps[1]), message_id));
        }
    }
    Err(Error::InvalidInput(format!("not a message link: {:?}", link)))
}

/// Which messages of a chat to fetch.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IdRange {
    /// Exactly this message.
    Single(i32),
    /// Everything strictly between the bounds; `0` leaves a side open.
    Span { min_id: i32, max_id: i32 },
}

impl IdRange {
    pub const ALL: IdRange = IdRange::Span { min_id: 0, max_id: 0 };

    /// Iteration options selecting this range.
    pub fn to_params(self, reverse: bool) -> IterMessages {
        match self {
            IdRange::Single(id) => IterMessages {
                ids: Some(id),
                ..Default::default()
            },
            IdRange::Span { min_id, max_id } => IterMessages {
                min_id,
                max_id,
                reverse,
                ..Default::default()
            },
        }
    }
}

fn parse_id(s: &str) -> Result<i32> {
    s.parse::<i32>()
        .map_err(|_| Error::InvalidInput(format!("invalid message id: {:?}", s)))
}

// Exclusive bounds one past `id` on either side
fn below(id: i32) -> Result<i32> {
    id.checked_sub(1)
        .ok_or_else(|| Error::InvalidInput(format!("message id out of range: {}", id)))
}

fn above(id: i32) -> Result<i32> {
    id.checked_add(1)
        .ok_or_else(|| Error::InvalidInput(format!("message id out of range: {}", id)))
}

/// Parse a comma separated list of ids and ranges.
///
/// `3-7` covers 3 to 7 inclusive, `9-` from 9 to the newest, `-4` from the
/// oldest to 4 and `5` just 5. Blank input selects the whole chat.
pub fn parse_id_ranges(input: &str) -> Result<Vec<IdRange>> {
    if input.trim().is_empty() {
        return Ok(vec![IdRange::ALL]);
    }

    let mut ranges = Vec::new();
    for part in input.split(',').map(str::trim) {
        if part.is_empty() {
            continue;
        }
        let range = match part.split_once('-') {
            None => IdRange::Single(parse_id(part)?),
            Some((start, end)) => match (start.trim(), end.trim()) {
                ("", "") => IdRange::ALL,
                (start, "") => IdRange::Span {
                    min_id: below(parse_id(start)?)?,
                    max_id: 0,
                },
                ("", end) => IdRange::Span {
                    min_id: 0,
                    max_id: above(parse_id(end)?)?,
                },
                (start, end) => {
                    let (a, b) = (parse_id(start)?, parse_id(end)?);
                    IdRange::Span {
                        min_id: below(a.min(b))?,
                        max_id: above(a.max(b))?,
                    }
                }
            },
        };
        ranges.push(range);
    }
    Ok(ranges)
}
