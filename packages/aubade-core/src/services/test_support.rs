//! Scripted Sonos client for service-level tests.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::settings::SpeakerTarget;
use crate::sonos::traits::{SonosContent, SonosGrouping, SonosTransport};
use crate::sonos::types::{QueuePage, TrackInfo, TrackProgress};
use crate::sonos::ClientResult;

/// Per-speaker scripted state.
#[derive(Debug, Clone, Default)]
pub(crate) struct SpeakerState {
    pub playing: bool,
    pub track_info: Option<TrackInfo>,
    pub station: String,
    pub uuid: Option<String>,
    pub volume: u8,
}

/// Fake client that records every call and answers from scripted state.
#[derive(Default)]
pub(crate) struct ScriptedSonos {
    state: Mutex<HashMap<String, SpeakerState>>,
    calls: Mutex<Vec<String>>,
    group_result: Mutex<bool>,
    station_result: Mutex<bool>,
}

impl ScriptedSonos {
    pub(crate) fn new() -> Self {
        Self {
            group_result: Mutex::new(true),
            station_result: Mutex::new(true),
            ..Default::default()
        }
    }

    pub(crate) fn set_state(&self, ip: &str, state: SpeakerState) {
        self.state.lock().insert(ip.to_string(), state);
    }

    pub(crate) fn update_state(&self, ip: &str, update: impl FnOnce(&mut SpeakerState)) {
        let mut state = self.state.lock();
        update(state.entry(ip.to_string()).or_default());
    }

    pub(crate) fn set_group_result(&self, joined: bool) {
        *self.group_result.lock() = joined;
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    pub(crate) fn calls_matching(&self, prefix: &str) -> Vec<String> {
        self.calls
            .lock()
            .iter()
            .filter(|c| c.starts_with(prefix))
            .cloned()
            .collect()
    }

    fn record(&self, call: String) {
        self.calls.lock().push(call);
    }

    fn speaker(&self, ip: &str) -> SpeakerState {
        self.state.lock().get(ip).cloned().unwrap_or_default()
    }
}

#[async_trait]
impl SonosTransport for ScriptedSonos {
    async fn start_playing(&self, ip: &str) -> ClientResult<()> {
        self.record(format!("play:{ip}"));
        self.update_state(ip, |s| s.playing = true);
        Ok(())
    }

    async fn pause_playing(&self, ip: &str) -> ClientResult<()> {
        self.record(format!("pause:{ip}"));
        self.update_state(ip, |s| s.playing = false);
        Ok(())
    }

    async fn stop_playing(&self, ip: &str) -> ClientResult<()> {
        self.record(format!("stop:{ip}"));
        self.update_state(ip, |s| s.playing = false);
        Ok(())
    }

    async fn next_track(&self, ip: &str) -> ClientResult<()> {
        self.record(format!("next:{ip}"));
        Ok(())
    }

    async fn previous_track(&self, ip: &str) -> ClientResult<()> {
        self.record(format!("previous:{ip}"));
        Ok(())
    }

    async fn clear_queue(&self, ip: &str) -> ClientResult<()> {
        self.record(format!("clear_queue:{ip}"));
        Ok(())
    }

    async fn get_is_playing(&self, ip: &str) -> ClientResult<bool> {
        Ok(self.speaker(ip).playing)
    }

    async fn get_volume(&self, ip: &str) -> ClientResult<u8> {
        Ok(self.speaker(ip).volume)
    }

    async fn set_volume(&self, ip: &str, volume: u8) -> ClientResult<()> {
        self.record(format!("set_volume:{ip}:{volume}"));
        self.update_state(ip, |s| s.volume = volume);
        Ok(())
    }

    async fn set_station(&self, ip: &str, station: &str) -> ClientResult<bool> {
        self.record(format!("set_station:{ip}:{station}"));
        let accepted = *self.station_result.lock();
        if accepted {
            self.update_state(ip, |s| {
                s.playing = true;
                s.station = station.to_string();
            });
        }
        Ok(accepted)
    }

    async fn reboot_device(&self, ip: &str) -> ClientResult<()> {
        self.record(format!("reboot:{ip}"));
        Ok(())
    }
}

#[async_trait]
impl SonosContent for ScriptedSonos {
    async fn get_track_info(&self, ip: &str) -> ClientResult<Option<TrackInfo>> {
        Ok(self.speaker(ip).track_info)
    }

    async fn get_current_track(&self, ip: &str) -> ClientResult<String> {
        Ok(self
            .speaker(ip)
            .track_info
            .map(|i| i.display_string())
            .unwrap_or_else(|| "No metadata available".to_string()))
    }

    async fn get_track_progress(&self, _ip: &str) -> ClientResult<TrackProgress> {
        Ok(TrackProgress::default())
    }

    async fn get_current_station(&self, ip: &str) -> ClientResult<String> {
        Ok(self.speaker(ip).station)
    }

    async fn get_queue(
        &self,
        _ip: &str,
        start_index: usize,
        _count: usize,
    ) -> ClientResult<QueuePage> {
        Ok(QueuePage::empty(start_index))
    }

    async fn play_spotify(
        &self,
        ip: &str,
        url: &str,
        fallback_station: Option<&str>,
    ) -> ClientResult<()> {
        self.record(format!(
            "play_spotify:{ip}:{url}:{}",
            fallback_station.unwrap_or("-")
        ));
        self.update_state(ip, |s| s.playing = true);
        Ok(())
    }

    async fn play_youtube_music(
        &self,
        ip: &str,
        url: &str,
        fallback_station: Option<&str>,
    ) -> ClientResult<()> {
        self.record(format!(
            "play_youtube:{ip}:{url}:{}",
            fallback_station.unwrap_or("-")
        ));
        self.update_state(ip, |s| s.playing = true);
        Ok(())
    }
}

#[async_trait]
impl SonosGrouping for ScriptedSonos {
    async fn get_speaker_uuid(&self, ip: &str) -> ClientResult<Option<String>> {
        Ok(self.speaker(ip).uuid)
    }

    async fn create_group(&self, master_ip: &str, slave_ips: &[String]) -> ClientResult<bool> {
        self.record(format!("create_group:{master_ip}:{}", slave_ips.join("+")));
        Ok(*self.group_result.lock())
    }

    async fn ungroup_speaker(&self, ip: &str) -> ClientResult<()> {
        self.record(format!("ungroup:{ip}"));
        Ok(())
    }

    async fn get_speakers_in_group(
        &self,
        ip: &str,
        _roster: &[SpeakerTarget],
    ) -> ClientResult<Vec<String>> {
        Ok(vec![ip.to_string()])
    }
}
