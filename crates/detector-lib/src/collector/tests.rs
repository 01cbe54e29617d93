//! Acquisition tests
//!
//! HTTP sources run against a local mock server.

#[cfg(test)]
mod parsing_tests {
    use crate::collector::{parse_exposition, parse_query_response, sample_from_series};
    use crate::models::TrackedMetric;

    #[test]
    fn test_parse_query_response_reads_first_value() {
        let body = r#"{
            "status": "success",
            "data": {
                "resultType": "vector",
                "result": [
                    {"metric": {"instance": "node-1"}, "value": [1718000000.123, "42.5"]},
                    {"metric": {"instance": "node-2"}, "value": [1718000000.123, "7"]}
                ]
            }
        }"#;
        assert_eq!(parse_query_response(body).unwrap(), 42.5);
    }

    #[test]
    fn test_parse_query_response_empty_result() {
        let body = r#"{"status":"success","data":{"resultType":"vector","result":[]}}"#;
        assert!(parse_query_response(body).is_err());
    }

    #[test]
    fn test_parse_query_response_error_status() {
        let body = r#"{"status":"error","errorType":"bad_data","error":"parse error"}"#;
        let err = parse_query_response(body).unwrap_err();
        assert!(err.to_string().contains("parse error"));
    }

    #[test]
    fn test_parse_query_response_garbage() {
        assert!(parse_query_response("<html>").is_err());
        let body = r#"{"status":"success","data":{"result":[{"value":[1.0,"abc"]}]}}"#;
        assert!(parse_query_response(body).is_err());
    }

    #[test]
    fn test_parse_exposition_skips_comments() {
        let text = "\
# HELP cpu_usage_percent CPU usage
# TYPE cpu_usage_percent gauge
cpu_usage_percent 12.5

memory_usage_percent 48
node_load{window=\"1m\"} 0.75
broken_line
not_a_number abc
";
        let series = parse_exposition(text);
        assert_eq!(series.len(), 3);
        assert_eq!(series["cpu_usage_percent"], 12.5);
        assert_eq!(series["memory_usage_percent"], 48.0);
        assert_eq!(series["node_load{window=\"1m\"}"], 0.75);
    }

    #[test]
    fn test_sample_from_series_marks_absent_as_nan() {
        let series = parse_exposition("cpu_usage_percent 10\ndisk_usage_percent 20\n");
        let sample = sample_from_series(&series);

        assert_eq!(sample.get(TrackedMetric::CpuUsage), 10.0);
        assert_eq!(sample.get(TrackedMetric::DiskUsage), 20.0);
        assert_eq!(
            sample.missing_metrics(),
            vec![TrackedMetric::MemoryUsage, TrackedMetric::NetworkRx]
        );
    }
}

#[cfg(test)]
mod http_source_tests {
    use crate::collector::{promql_query, ExpositionSource, PrometheusSource, SampleSource};
    use crate::models::TrackedMetric;
    use mockito::Matcher;
    use std::time::Duration;

    fn query_body(value: &str) -> String {
        format!(
            r#"{{"status":"success","data":{{"resultType":"vector","result":[{{"metric":{{}},"value":[1718000000,"{}"]}}]}}}}"#,
            value
        )
    }

    #[tokio::test]
    async fn test_prometheus_source_resolves_each_metric() {
        let mut server = mockito::Server::new_async().await;
        let values = ["31.5", "52", "40.25", "1024"];

        let mut mocks = Vec::new();
        for (metric, value) in TrackedMetric::ALL.iter().zip(values) {
            let mock = server
                .mock("GET", "/api/v1/query")
                .match_query(Matcher::UrlEncoded(
                    "query".into(),
                    promql_query(*metric).into(),
                ))
                .with_status(200)
                .with_header("content-type", "application/json")
                .with_body(query_body(value))
                .create_async()
                .await;
            mocks.push(mock);
        }

        let source = PrometheusSource::new(server.url(), Duration::from_secs(5)).unwrap();
        let sample = source.get_sample().await;

        assert!(sample.is_complete());
        assert_eq!(sample.values, [31.5, 52.0, 40.25, 1024.0]);
        for mock in mocks {
            mock.assert_async().await;
        }
    }

    #[tokio::test]
    async fn test_prometheus_source_failed_query_is_nan() {
        let mut server = mockito::Server::new_async().await;
        let mut mocks = Vec::new();
        for metric in TrackedMetric::ALL {
            let status = if metric == TrackedMetric::DiskUsage { 500 } else { 200 };
            let mock = server
                .mock("GET", "/api/v1/query")
                .match_query(Matcher::UrlEncoded(
                    "query".into(),
                    promql_query(metric).into(),
                ))
                .with_status(status)
                .with_body(query_body("10"))
                .create_async()
                .await;
            mocks.push(mock);
        }

        let source = PrometheusSource::new(server.url(), Duration::from_secs(5)).unwrap();
        let sample = source.get_sample().await;

        assert_eq!(sample.missing_metrics(), vec![TrackedMetric::DiskUsage]);
        assert_eq!(sample.get(TrackedMetric::CpuUsage), 10.0);
    }

    #[tokio::test]
    async fn test_prometheus_source_unreachable() {
        let source =
            PrometheusSource::new("http://127.0.0.1:1", Duration::from_millis(200)).unwrap();
        let sample = source.get_sample().await;
        assert_eq!(sample.missing_metrics().len(), TrackedMetric::COUNT);
    }

    #[tokio::test]
    async fn test_exposition_source_maps_series() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/metrics")
            .with_status(200)
            .with_header("content-type", "text/plain; version=0.0.4")
            .with_body(
                "# TYPE cpu_usage_percent gauge\n\
                 cpu_usage_percent 25\n\
                 memory_usage_percent 60\n\
                 disk_usage_percent 45\n\
                 network_receive_bytes_per_second 2048\n\
                 aiops_anomaly_score 0.1\n",
            )
            .create_async()
            .await;

        let source = ExpositionSource::new(
            format!("{}/metrics", server.url()),
            Duration::from_secs(5),
        )
        .unwrap();
        let sample = source.get_sample().await;

        mock.assert_async().await;
        assert_eq!(sample.values, [25.0, 60.0, 45.0, 2048.0]);
        assert_eq!(source.name(), "exposition");
    }

    #[tokio::test]
    async fn test_exposition_source_http_error_is_unresolved() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/metrics")
            .with_status(503)
            .create_async()
            .await;

        let source = ExpositionSource::new(
            format!("{}/metrics", server.url()),
            Duration::from_secs(5),
        )
        .unwrap();
        assert!(!source.get_sample().await.is_complete());
    }
}

#[cfg(test)]
mod synthetic_tests {
    use crate::collector::{SampleProfile, SampleSource, SyntheticSource};
    use crate::models::TrackedMetric;

    #[test]
    fn test_series_split() {
        assert_eq!(SyntheticSource::series_profile(0, 50), SampleProfile::Normal);
        assert_eq!(SyntheticSource::series_profile(39, 50), SampleProfile::Normal);
        assert_eq!(SyntheticSource::series_profile(40, 50), SampleProfile::Anomalous);
        assert_eq!(SyntheticSource::series_profile(49, 50), SampleProfile::Anomalous);
    }

    #[test]
    fn test_series_is_seeded_and_clamped() {
        let a = SyntheticSource::series(50, 7);
        let b = SyntheticSource::series(50, 7);

        assert_eq!(a.len(), 50);
        for (x, y) in a.iter().zip(&b) {
            assert_eq!(x.values, y.values);
        }
        for sample in &a {
            assert!(sample.is_complete());
            assert!(sample.values.iter().all(|v| (0.0..=100.0).contains(v)));
        }
    }

    #[test]
    fn test_anomalous_profile_runs_hot() {
        let series = SyntheticSource::series(100, 3);
        let mean_cpu = |samples: &[crate::models::MetricSample]| {
            samples.iter().map(|s| s.get(TrackedMetric::CpuUsage)).sum::<f64>()
                / samples.len() as f64
        };
        assert!(mean_cpu(&series[..80]) < 50.0);
        assert!(mean_cpu(&series[80..]) > 75.0);
    }

    #[tokio::test]
    async fn test_synthetic_source_rate_extremes() {
        let calm = SyntheticSource::new(1, 0.0);
        let hot = SyntheticSource::new(1, 1.0);

        let mut cpu_total = 0.0;
        for _ in 0..20 {
            let sample = calm.get_sample().await;
            assert!(sample.is_complete());
            cpu_total += sample.get(TrackedMetric::CpuUsage);
        }
        assert!(cpu_total / 20.0 < 50.0);

        let sample = hot.get_sample().await;
        assert!(sample.get(TrackedMetric::CpuUsage) > 60.0);
        assert_eq!(hot.name(), "synthetic");
    }
}
