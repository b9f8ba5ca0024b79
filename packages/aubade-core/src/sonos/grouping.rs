//! Multi-room group management.
//!
//! Grouping is slave-driven: each slave is pointed at the master's group
//! URI, there is no call against the master itself. Membership checks match
//! the group roster against the UUIDs cached in the configured speaker
//! list, so a speaker without a cached UUID never shows up as a member.

use reqwest::Client;

use super::didl::group_join_metadata;
use super::music_services::{get_rincon_id, get_speaker_uuid};
use super::services::SonosService;
use super::soap::SoapRequestBuilder;
use super::transport::{ensure_address, start_playing, ClientResult};
use super::utils::extract_xml_text;
use crate::protocol_constants::{GROUP_URI_PREFIX, STANDALONE_TRANSPORT_URI};
use crate::settings::SpeakerTarget;

/// Joins every slave to the master's playback group.
///
/// Slaves are processed independently: one failing to join does not stop
/// the others. Returns whether every slave ended up in the group.
pub async fn create_group(
    client: &Client,
    master_ip: &str,
    slave_ips: &[String],
) -> ClientResult<bool> {
    ensure_address(master_ip)?;
    let Some(master_rincon) = get_rincon_id(client, master_ip).await? else {
        log::warn!("[Sonos] Cannot group: no RINCON id for master {}", master_ip);
        return Ok(false);
    };

    let group_uri = format!("{GROUP_URI_PREFIX}uuid:RINCON_{master_rincon}");
    let metadata = group_join_metadata(&master_rincon);
    let mut all_joined = true;

    for slave_ip in slave_ips {
        if slave_ip == master_ip {
            continue;
        }
        // A slave that cannot report its own UUID is not reachable enough
        // to join reliably.
        match get_speaker_uuid(client, slave_ip).await? {
            Some(_) => {}
            None => {
                log::warn!("[Sonos] Skipping {}: no UUID reported", slave_ip);
                all_joined = false;
                continue;
            }
        }

        let result = SoapRequestBuilder::new(client, slave_ip)
            .service(SonosService::AVTransport)
            .action("SetAVTransportURI")
            .instance_id()
            .arg("CurrentURI", group_uri.as_str())
            .arg("CurrentURIMetaData", metadata.as_str())
            .send()
            .await;

        match result {
            Ok(_) => {
                log::info!("[Sonos] {} joined group of {}", slave_ip, master_ip);
                start_playing(client, slave_ip).await?;
            }
            Err(e) => {
                log::warn!("[Sonos] {} failed to join group: {}", slave_ip, e);
                all_joined = false;
            }
        }
    }

    Ok(all_joined)
}

/// Detaches a speaker from any group and returns it to standalone playback.
pub async fn ungroup_speaker(client: &Client, ip: &str) -> ClientResult<()> {
    ensure_address(ip)?;
    let result = SoapRequestBuilder::new(client, ip)
        .service(SonosService::AVTransport)
        .action("SetAVTransportURI")
        .instance_id()
        .arg("CurrentURI", STANDALONE_TRANSPORT_URI)
        .arg("CurrentURIMetaData", "")
        .send()
        .await;

    match result {
        Ok(_) => log::debug!("[Sonos] {} ungrouped", ip),
        Err(e) => log::warn!("[Sonos] Ungroup failed for {}: {}", ip, e),
    }
    Ok(())
}

/// Resolves which configured speakers play in the same group as `ip`.
///
/// A standalone speaker answers just itself; an unreachable one answers an
/// empty list. Only speakers whose UUID is cached in `roster` can be
/// resolved back to an address.
pub async fn get_speakers_in_group(
    client: &Client,
    ip: &str,
    roster: &[SpeakerTarget],
) -> ClientResult<Vec<String>> {
    ensure_address(ip)?;
    let result = SoapRequestBuilder::new(client, ip)
        .service(SonosService::AVTransport)
        .action("GetTransportInfo")
        .instance_id()
        .send()
        .await;

    let response = match result {
        Ok(response) => response,
        Err(e) => {
            log::debug!("[Sonos] Group lookup failed for {}: {}", ip, e);
            return Ok(Vec::new());
        }
    };

    let Some(current_uri) = extract_xml_text(&response, "CurrentURI") else {
        return Ok(vec![ip.to_string()]);
    };
    let Some(member_list) = current_uri.strip_prefix(GROUP_URI_PREFIX) else {
        return Ok(vec![ip.to_string()]);
    };

    let members: Vec<String> = member_list
        .split('+')
        .filter_map(|uuid| {
            let uuid = uuid.trim();
            roster
                .iter()
                .find(|s| s.uuid.as_deref() == Some(uuid))
                .map(|s| s.ip_address.clone())
        })
        .collect();

    Ok(members)
}
